// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod app {
    pub use crate::app::*;
}

pub mod dashboard {
    pub use crate::dashboard::*;
}
