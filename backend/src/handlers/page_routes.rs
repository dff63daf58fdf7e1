use std::path::Path;
use std::sync::Arc;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::AppState;

/// Clean URL -> file under the static dir.
pub const LANDING_PAGES: &[(&str, &str)] = &[
    ("/", "index.html"),
    ("/about", "about.html"),
    ("/build", "build.html"),
    ("/ai-cloud-alternative", "ai-cloud-alternative.html"),
];

/// Landing pages plus every other asset in `static_dir` (scripts, images,
/// robots.txt). Unknown paths fall through to `ServeDir` and get its 404.
pub fn landing_pages(static_dir: &str) -> Router<Arc<AppState>> {
    let root = Path::new(static_dir);
    let mut router = Router::new();
    for (route, file) in LANDING_PAGES {
        router = router.route_service(route, ServeFile::new(root.join(file)));
    }
    router.fallback_service(ServeDir::new(root))
}
