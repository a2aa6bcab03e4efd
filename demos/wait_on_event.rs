//! Manual-test binary: creates a Windows event, spawns a task that waits on
//! it, then signals it from another thread after a short delay.
//!
//! Run with: `cargo run --features bin --bin wait_on_event`

use std::time::Duration;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use winwait::kernel::Win32Kernel;
use winwait::runtime::TokioRuntime;
use winwait::{wait_for_single_object, WaitPool};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let kernel = Win32Kernel;
    let pool = WaitPool::new(kernel, TokioRuntime::current());

    let handle = unsafe {
        windows_sys::Win32::System::Threading::CreateEventW(std::ptr::null(), 1, 0, std::ptr::null())
    };
    if handle == 0 {
        tracing::error!("failed to create demo event");
        return;
    }

    let waiter_pool = pool.clone();
    let waiter = tokio::spawn(async move {
        tracing::info!("waiting for the event to be signaled");
        match wait_for_single_object(&waiter_pool, handle).await {
            Ok(()) => tracing::info!("event signaled"),
            Err(err) => tracing::error!(%err, "wait failed"),
        }
    });

    tokio::time::sleep(Duration::from_millis(250)).await;
    tracing::info!("signaling the event");
    unsafe {
        windows_sys::Win32::System::Threading::SetEvent(handle);
    }

    let _ = waiter.await;
    unsafe {
        windows_sys::Win32::Foundation::CloseHandle(handle);
    }
}
