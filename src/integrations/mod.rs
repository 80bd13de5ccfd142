//! Upstream API integrations.

pub mod argenstats_client {
    pub use crate::argenstats_client::*;
}

pub mod normalize {
    pub use crate::normalize::*;
}

pub mod services {
    pub use crate::services::*;
}
