//! Fatal error reporting for reference counting violations
//!
//! A violation is reported once through `log`, then through the installed
//! hook (if any), and finally turned into a panic. Hook registration is
//! the only synchronized state in the object model.

use parking_lot::RwLock;

use crate::error::ObjectError;

/// Callback invoked before a fatal violation panics
pub type FatalHook = fn(&ObjectError);

lazy_static::lazy_static! {
    static ref FATAL_HOOK: RwLock<Option<FatalHook>> = RwLock::new(None);
}

/// Install a hook, returning the previous one
pub fn set_fatal_hook(hook: FatalHook) -> Option<FatalHook> {
    FATAL_HOOK.write().replace(hook)
}

/// Remove the installed hook, returning it
pub fn clear_fatal_hook() -> Option<FatalHook> {
    FATAL_HOOK.write().take()
}

/// Report a violation and panic
#[cold]
#[inline(never)]
pub fn fatal(err: ObjectError) -> ! {
    log::error!("fatal object error: {}", err);
    // copy the hook out so it runs without holding the lock
    let hook = *FATAL_HOOK.read();
    if let Some(hook) = hook {
        hook(&err);
    }
    panic!("{}", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_hook(err: &ObjectError) {
        if *err == ObjectError::DeleteInStack {
            HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_hook_runs_before_panic() {
        set_fatal_hook(counting_hook);
        let result = std::panic::catch_unwind(|| fatal(ObjectError::DeleteInStack));
        clear_fatal_hook();

        assert!(result.is_err());
        assert!(HOOK_CALLS.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_panic_message_is_error_text() {
        let result = std::panic::catch_unwind(|| fatal(ObjectError::DoubleDelete));
        let payload = result.unwrap_err();
        let message = payload
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        assert_eq!(message, "Double deletion of object");
    }
}
