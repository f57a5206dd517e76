//! Change subscriptions and their disposers

use crate::tree::FormTree;
use formkit_core::Value;
use std::fmt;

/// Handler for changes of one control.
pub type FieldHandler = Box<dyn FnMut(&mut FormTree, &Value)>;

/// Handler for changes of any control; receives the field name.
pub type FormHandler = Box<dyn FnMut(&mut FormTree, &str, &Value)>;

/// Id of an attached change handler. Detach it with
/// [`FormTree::unsubscribe`] or through a [`SubscriptionBag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(pub(crate) u64);

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

pub(crate) enum Handler {
    Field { slot: usize, handler: FieldHandler },
    Form(FormHandler),
}

impl Handler {
    pub(crate) fn listens_to(&self, slot: usize) -> bool {
        match self {
            Handler::Field { slot: target, .. } => *target == slot,
            Handler::Form(_) => true,
        }
    }

    pub(crate) fn call(&mut self, tree: &mut FormTree, field: &str, value: &Value) {
        match self {
            Handler::Field { handler, .. } => handler(tree, value),
            Handler::Form(handler) => handler(tree, field, value),
        }
    }
}

/// Set of subscriptions owned by one consumer, disposed exactly once.
#[derive(Debug, Default)]
pub struct SubscriptionBag {
    subscriptions: Vec<Subscription>,
    disposed: bool,
}

impl SubscriptionBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Detach every subscription from `tree`. Later calls do nothing.
    /// Returns how many handlers were actually detached.
    pub fn dispose(&mut self, tree: &mut FormTree) -> usize {
        if self.disposed {
            return 0;
        }
        self.disposed = true;
        let detached = self
            .subscriptions
            .drain(..)
            .filter(|sub| tree.unsubscribe(*sub))
            .count();
        tracing::debug!(form = %tree.id().as_uuid(), detached, "subscriptions disposed");
        detached
    }
}

impl Drop for SubscriptionBag {
    fn drop(&mut self) {
        if !self.disposed && !self.subscriptions.is_empty() {
            tracing::warn!(
                pending = self.subscriptions.len(),
                "subscription bag dropped without dispose; handlers stay attached"
            );
        }
    }
}
