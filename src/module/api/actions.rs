//! Cross-module action registry
//!
//! Modules publish named async functions that other modules call by
//! `(module id, action id)`. Actions are stored type-erased; callers recover
//! a typed [`ActionFn`] with a checked downcast so a signature mismatch is an
//! error rather than undefined behaviour.

use futures::future::BoxFuture;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::module::traits::ModuleError;

type ErasedValue = Box<dyn Any + Send>;
type ErasedFn =
    dyn Fn(ErasedValue) -> BoxFuture<'static, Result<ErasedValue, ModuleError>> + Send + Sync;

/// A type-erased async function `A -> Result<R, ModuleError>`
#[derive(Clone)]
pub struct Action {
    signature: TypeId,
    signature_name: &'static str,
    f: Arc<ErasedFn>,
}

impl Action {
    /// Wrap an async function as an action
    pub fn new<A, R, F, Fut>(f: F) -> Self
    where
        A: Send + 'static,
        R: Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ModuleError>> + Send + 'static,
    {
        let f = Arc::new(f);
        let erased = move |arg: ErasedValue| -> BoxFuture<'static, Result<ErasedValue, ModuleError>> {
            let f = Arc::clone(&f);
            Box::pin(async move {
                let arg = arg.downcast::<A>().map_err(|_| {
                    ModuleError::OperationError(format!(
                        "Action argument is not {}",
                        type_name::<A>()
                    ))
                })?;
                let out = (*f)(*arg).await?;
                Ok(Box::new(out) as ErasedValue)
            })
        };
        Self {
            signature: TypeId::of::<fn(A) -> R>(),
            signature_name: type_name::<fn(A) -> R>(),
            f: Arc::new(erased),
        }
    }

    /// Human-readable signature, e.g. `fn(alloc::string::String) -> bool`
    pub fn signature(&self) -> &'static str {
        self.signature_name
    }

    /// Whether this action has signature `fn(A) -> R`
    pub fn accepts<A: 'static, R: 'static>(&self) -> bool {
        self.signature == TypeId::of::<fn(A) -> R>()
    }

    /// Recover the typed function, checking the signature
    pub fn typed<A, R>(&self, module_id: &str, action_id: &str) -> Result<ActionFn<A, R>, ModuleError>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        if !self.accepts::<A, R>() {
            return Err(ModuleError::ActionSignatureMismatch {
                module_id: module_id.to_string(),
                action_id: action_id.to_string(),
                expected: type_name::<fn(A) -> R>(),
                actual: self.signature_name,
            });
        }
        Ok(ActionFn {
            action: self.clone(),
            _marker: PhantomData,
        })
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("signature", &self.signature_name)
            .finish()
    }
}

/// Typed handle to an [`Action`]
pub struct ActionFn<A, R> {
    action: Action,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A, R> Clone for ActionFn<A, R> {
    fn clone(&self) -> Self {
        Self {
            action: self.action.clone(),
            _marker: PhantomData,
        }
    }
}

impl<A, R> fmt::Debug for ActionFn<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionFn")
            .field(&self.action.signature_name)
            .finish()
    }
}

impl<A, R> ActionFn<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    /// Invoke the action
    pub async fn call(&self, arg: A) -> Result<R, ModuleError> {
        let out = (self.action.f)(Box::new(arg)).await?;
        out.downcast::<R>().map(|r| *r).map_err(|_| {
            ModuleError::OperationError(format!("Action result is not {}", type_name::<R>()))
        })
    }
}

/// Registry of actions keyed by module id then action id
///
/// Populated during registration, then frozen behind an `Arc`.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, HashMap<String, Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every action a module publishes
    pub fn register_actions(&mut self, module_id: &str, actions: HashMap<String, Action>) {
        if actions.is_empty() {
            return;
        }
        let entry = self.actions.entry(module_id.to_string()).or_default();
        for (action_id, action) in actions {
            if entry.contains_key(&action_id) {
                warn!(
                    "Action {}.{} already registered, keeping the first",
                    module_id, action_id
                );
                continue;
            }
            debug!("Registered action {}.{}", module_id, action_id);
            entry.insert(action_id, action);
        }
    }

    /// Look up an action; `None` if the module or action does not exist
    pub fn lookup(&self, module_id: &str, action_id: &str) -> Option<&Action> {
        self.actions.get(module_id)?.get(action_id)
    }

    /// Look up an action and recover its typed form
    pub fn typed<A, R>(
        &self,
        module_id: &str,
        action_id: &str,
    ) -> Result<Option<ActionFn<A, R>>, ModuleError>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        self.lookup(module_id, action_id)
            .map(|action| action.typed(module_id, action_id))
            .transpose()
    }

    /// Look up and invoke in one step; `Ok(None)` if the action does not exist
    pub async fn call<A, R>(
        &self,
        module_id: &str,
        action_id: &str,
        arg: A,
    ) -> Result<Option<R>, ModuleError>
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        match self.typed::<A, R>(module_id, action_id)? {
            Some(action) => action.call(arg).await.map(Some),
            None => Ok(None),
        }
    }

    /// Action ids published by a module, sorted
    pub fn action_ids(&self, module_id: &str) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .actions
            .get(module_id)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Total number of registered actions
    pub fn len(&self) -> usize {
        self.actions.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ActionRegistry {
        let mut actions = HashMap::new();
        actions.insert(
            "double".to_string(),
            Action::new(|n: u32| async move { Ok(n * 2) }),
        );
        actions.insert(
            "fail".to_string(),
            Action::new(|_: ()| async { Err::<(), _>(ModuleError::OperationError("nope".into())) }),
        );
        let mut registry = ActionRegistry::new();
        registry.register_actions("math", actions);
        registry
    }

    #[tokio::test]
    async fn typed_call_round_trips() {
        let registry = registry();
        let double = registry.typed::<u32, u32>("math", "double").unwrap().unwrap();
        assert_eq!(double.call(21).await.unwrap(), 42);
        assert_eq!(
            registry.call::<u32, u32>("math", "double", 4).await.unwrap(),
            Some(8)
        );
    }

    #[test]
    fn missing_action_is_none() {
        let registry = registry();
        assert!(registry.lookup("math", "triple").is_none());
        assert!(registry.lookup("physics", "double").is_none());
        assert!(registry.typed::<u32, u32>("physics", "double").unwrap().is_none());
    }

    #[test]
    fn signature_mismatch_is_reported() {
        let registry = registry();
        let err = registry.typed::<String, u32>("math", "double").unwrap_err();
        match err {
            ModuleError::ActionSignatureMismatch {
                module_id,
                action_id,
                expected,
                actual,
            } => {
                assert_eq!(module_id, "math");
                assert_eq!(action_id, "double");
                assert!(expected.contains("String"));
                assert!(actual.contains("u32"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn action_errors_propagate() {
        let registry = registry();
        let err = registry.call::<(), ()>("math", "fail", ()).await.unwrap_err();
        assert!(matches!(err, ModuleError::OperationError(_)));
    }

    #[test]
    fn lists_action_ids() {
        let registry = registry();
        assert_eq!(registry.action_ids("math"), vec!["double", "fail"]);
        assert_eq!(registry.len(), 2);
    }
}
