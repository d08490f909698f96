//! Cloud-anchor request tracking

pub mod coordinator;

pub use coordinator::{
    CloudAnchorCallback, CloudAnchorCoordinator, CloudRequestError, CoordinatorConfig, RequestId,
    RequestKind,
};
