//! Direct `windows-sys` bindings backing [`Kernel`].
//!
//! https://learn.microsoft.com/en-us/windows/win32/api/synchapi/nf-synchapi-waitformultipleobjects
//! https://learn.microsoft.com/en-us/windows/win32/api/synchapi/nf-synchapi-waitforsingleobject

use super::{Handle, Kernel};
use crate::error::OsError;
use windows_sys::Win32::Foundation::{
    CloseHandle, WAIT_ABANDONED_0, WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::System::Threading::{
    CreateEventW, SetEvent, WaitForMultipleObjects, WaitForSingleObject, INFINITE,
};

/// The real kernel binding, used everywhere outside tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Kernel;

impl Kernel for Win32Kernel {
    fn create_event(&self) -> Result<Handle, OsError> {
        // bManualReset = TRUE, bInitialState = FALSE
        let handle = unsafe { CreateEventW(std::ptr::null(), 1, 0, std::ptr::null()) };
        if handle == 0 {
            Err(OsError::last_os_error())
        } else {
            Ok(handle)
        }
    }

    fn set_event(&self, handle: Handle) {
        unsafe { SetEvent(handle) };
    }

    fn close_handle(&self, handle: Handle) {
        unsafe { CloseHandle(handle) };
    }

    fn wait_multi(&self, handles: &[Handle]) -> Result<usize, OsError> {
        debug_assert!(handles.len() <= 64, "WaitForMultipleObjects caps at 64 handles");
        let retcode = unsafe {
            WaitForMultipleObjects(handles.len() as u32, handles.as_ptr(), 0, INFINITE)
        };
        if retcode == WAIT_FAILED {
            return Err(OsError::last_os_error());
        }
        if retcode >= WAIT_ABANDONED_0 {
            let index = (retcode - WAIT_ABANDONED_0) as usize;
            tracing::warn!(index, "abandoned mutex observed in wait group, treating as signaled");
            return Ok(index);
        }
        Ok((retcode - WAIT_OBJECT_0) as usize)
    }

    fn is_signaled(&self, handle: Handle) -> Result<bool, OsError> {
        let retcode = unsafe { WaitForSingleObject(handle, 0) };
        if retcode == WAIT_FAILED {
            return Err(OsError::last_os_error());
        }
        Ok(retcode != WAIT_TIMEOUT)
    }
}
