//! Request classification.
//!
//! Every intercepted request falls into one [`RouteKind`], which decides the
//! caching strategy. The longest matching configured prefix wins; if none
//! matches, a static file extension still marks the request as an asset.

use crate::config::RouteConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Scripts, styles, fonts, images. Cache-first, static partition.
    StaticAsset,
    /// Generated QR images. Cache-first, dynamic partition, placeholder fallback.
    QrImage,
    /// Backend API. Network-first, dynamic partition, offline JSON fallback.
    Api,
    /// Everything else. Network-first, dynamic partition.
    Page,
}

#[derive(Debug, Clone)]
pub struct Router {
    prefixes: Vec<(String, RouteKind)>,
    static_extensions: Vec<String>,
}

impl Router {
    pub fn new(routes: &RouteConfig) -> Self {
        let mut prefixes: Vec<(String, RouteKind)> = routes
            .static_prefixes
            .iter()
            .map(|p| (p.clone(), RouteKind::StaticAsset))
            .chain(routes.qr_prefixes.iter().map(|p| (p.clone(), RouteKind::QrImage)))
            .chain(routes.api_prefixes.iter().map(|p| (p.clone(), RouteKind::Api)))
            .collect();
        // Longest first so the first hit is the longest match
        prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            prefixes,
            static_extensions: routes
                .static_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn classify(&self, path: &str) -> RouteKind {
        if let Some((_, kind)) = self.prefixes.iter().find(|(prefix, _)| path.starts_with(prefix.as_str())) {
            return *kind;
        }
        if self.has_static_extension(path) {
            RouteKind::StaticAsset
        } else {
            RouteKind::Page
        }
    }

    fn has_static_extension(&self, path: &str) -> bool {
        let file = path.rsplit('/').next().unwrap_or(path);
        match file.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                let ext = ext.to_ascii_lowercase();
                self.static_extensions.iter().any(|e| *e == ext)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new(&RouteConfig::default())
    }

    #[test]
    fn test_prefix_classification() {
        let r = router();
        assert_eq!(r.classify("/static/js/main.3f2a.js"), RouteKind::StaticAsset);
        assert_eq!(r.classify("/fonts/Nunito.woff2"), RouteKind::StaticAsset);
        assert_eq!(r.classify("/qr-codes/ABC123.png"), RouteKind::QrImage);
        assert_eq!(r.classify("/api/levels/3"), RouteKind::Api);
        assert_eq!(r.classify("/"), RouteKind::Page);
        assert_eq!(r.classify("/play/level-2"), RouteKind::Page);
    }

    #[test]
    fn test_extension_fallback() {
        let r = router();
        assert_eq!(r.classify("/logo192.png"), RouteKind::StaticAsset);
        assert_eq!(r.classify("/favicon.ICO"), RouteKind::StaticAsset);
        assert_eq!(r.classify("/index.html"), RouteKind::Page);
        assert_eq!(r.classify("/manifest.json"), RouteKind::Page);
        assert_eq!(r.classify("/.png"), RouteKind::Page);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let routes = RouteConfig {
            static_prefixes: vec!["/api/assets/".to_string()],
            api_prefixes: vec!["/api/".to_string()],
            ..RouteConfig::default()
        };
        let r = Router::new(&routes);
        assert_eq!(r.classify("/api/assets/logo.svg"), RouteKind::StaticAsset);
        assert_eq!(r.classify("/api/scores"), RouteKind::Api);
    }

    #[test]
    fn test_qr_prefix_beats_png_extension() {
        assert_eq!(router().classify("/qr-codes/team-7.png"), RouteKind::QrImage);
    }
}
