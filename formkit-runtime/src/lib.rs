//! formkit Runtime - Live Form Tree
//!
//! Materializes descriptor lists into a tree of controls, moves business
//! objects in and out of it, guards submission and decides which error
//! messages are visible.
//!
//! ```text
//! Vec<FormItem>
//!     ↓ materialize
//! FormTree ──watch──→ change handlers (Subscription / SubscriptionBag)
//!     ↑↓ transfer_object_to_tree / transfer_tree_to_object
//! Record
//! ```
//!
//! Everything runs on one thread. Handlers receive `&mut FormTree` and may
//! set further values; those changes are queued and delivered in order.

pub mod control;
pub mod display;
pub mod subscription;
pub mod transfer;
pub mod tree;

pub use control::Control;
pub use display::{should_display, should_display_group};
pub use subscription::{FieldHandler, FormHandler, Subscription, SubscriptionBag};
pub use tree::{Entry, FormTree, GroupState};
