//! Session orchestration over the frame stream and user actions

pub mod controller;

pub use controller::{
    AnchorSessionController, SessionError, Severity, SlotState, StatusMessage,
};
