//! `critical-section` 1.x provider for the ESP-IDF target.
//!
//! The MQTT inbox is an `embassy_sync` channel guarded by
//! `CriticalSectionRawMutex`, which links against the two
//! `_critical_section_1_0_*` symbols below. On ESP-IDF we have real
//! threads, so a process-wide std mutex is enough; nesting on the same
//! thread is tracked with a per-thread depth counter.
//!
//! Host test builds get the symbols from the `critical-section/std`
//! dev-dependency instead.

#[cfg(target_os = "espidf")]
mod imp {
    use core::cell::{Cell, RefCell};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    static LOCK: Mutex<()> = Mutex::new(());

    thread_local! {
        static NESTING: Cell<u8> = const { Cell::new(0) };
        static HELD: RefCell<Option<MutexGuard<'static, ()>>> = const { RefCell::new(None) };
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
        let outer = NESTING.with(Cell::get);
        if outer == 0 {
            // A panic while holding the lock cannot corrupt `()`.
            let guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            HELD.with(|held| *held.borrow_mut() = Some(guard));
        }
        NESTING.with(|n| n.set(outer.saturating_add(1)));
        outer
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _critical_section_1_0_release(outer: u8) {
        NESTING.with(|n| n.set(outer));
        if outer == 0 {
            HELD.with(|held| held.borrow_mut().take());
        }
    }
}
