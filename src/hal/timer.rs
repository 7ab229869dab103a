//! Timer HAL backing the jiffies clock.
//!
//! Timer group 0, timer 0, clocked at APB / 640 = 125 kHz (8 µs per
//! jiffy). An auto-reloading alarm every [`GroupTimer::RANGE`] counts
//! stands in for a hardware overflow; its interrupt folds one range into
//! the [`OverflowAccumulator`].

use core::ffi::c_void;

use esp_idf_svc::hal::interrupt;
use esp_idf_svc::sys::{self, esp, EspError};

use crate::jiffies::{OverflowAccumulator, TimerHardware};

const APB_DIVIDER: u32 = 640;

/// Legacy group timer used as the low-order jiffies counter.
pub struct GroupTimer {
    group: sys::timer_group_t,
    index: sys::timer_idx_t,
}

impl GroupTimer {
    /// Configure the timer (paused) and route its alarm interrupt to `hi`.
    pub fn new(hi: &'static OverflowAccumulator) -> Result<Self, EspError> {
        let group = sys::timer_group_t_TIMER_GROUP_0;
        let index = sys::timer_idx_t_TIMER_0;

        let config = sys::timer_config_t {
            alarm_en: sys::timer_alarm_t_TIMER_ALARM_EN,
            counter_en: sys::timer_start_t_TIMER_PAUSE,
            intr_type: sys::timer_intr_mode_t_TIMER_INTR_LEVEL,
            counter_dir: sys::timer_count_dir_t_TIMER_COUNT_UP,
            auto_reload: sys::timer_autoreload_t_TIMER_AUTORELOAD_EN,
            divider: APB_DIVIDER,
            ..Default::default()
        };

        // SAFETY: `hi` is 'static and only touched atomically by the ISR.
        unsafe {
            esp!(sys::timer_init(group, index, &config))?;
            esp!(sys::timer_set_alarm_value(group, index, Self::RANGE as u64))?;
            esp!(sys::timer_isr_callback_add(
                group,
                index,
                Some(on_alarm),
                hi as *const OverflowAccumulator as *mut c_void,
                0,
            ))?;
        }

        Ok(Self { group, index })
    }
}

/// Overflow interrupt. The driver clears the status bit before calling.
unsafe extern "C" fn on_alarm(arg: *mut c_void) -> bool {
    let hi = &*(arg as *const OverflowAccumulator);
    hi.on_overflow(GroupTimer::RANGE);
    false
}

impl TimerHardware for GroupTimer {
    const RANGE: u32 = 256;

    fn restart(&self) {
        // SAFETY: group/index were initialized in `new`; these calls only
        // fail for invalid arguments.
        unsafe {
            sys::timer_pause(self.group, self.index);
            sys::timer_set_counter_value(self.group, self.index, 0);
            sys::timer_group_clr_intr_status_in_isr(self.group, self.index);
            sys::timer_enable_intr(self.group, self.index);
            sys::timer_start(self.group, self.index);
        }
    }

    #[inline]
    fn counter(&self) -> u32 {
        let mut value: u64 = 0;
        // SAFETY: valid timer, valid out pointer.
        unsafe {
            sys::timer_get_counter_value(self.group, self.index, &mut value);
        }
        value as u32
    }

    #[inline]
    fn overflow_pending(&self) -> bool {
        // SAFETY: reads the raw interrupt status register of the group.
        let status = unsafe { sys::timer_group_get_intr_status_in_isr(self.group) };
        status & (1 << self.index) != 0
    }

    #[inline]
    fn critical_section<R>(&self, f: impl FnOnce() -> R) -> R {
        interrupt::free(f)
    }
}
