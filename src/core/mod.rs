// Domain-layer modules and shared errors/models
pub mod aggregator {
    pub use crate::aggregator::*;
}

pub mod fallback {
    pub use crate::fallback::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
