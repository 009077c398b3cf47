//! POSIX crash-signal handler. Installs `sigaction` handlers for the five
//! fatal signals that writes an async-signal-safe marker to a fixed path
//! using only `open`/`write`/`close`/`raise`, then re-raises with the
//! default disposition. The marker is replayed as a synthetic fatal event
//! on the next start-up.
//!
//! Signal safety: the handler allocates nothing, takes no locks, and
//! formats no floats. It touches only a statically-sized buffer prepared
//! ahead of time by [`install`] and direct libc syscalls.

use crate::model::Event;
use beacon_api::Level;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const MARKER_FILE_NAME: &str = ".beacon-crash";
const MAX_PATH_LEN: usize = 4096;
const FATAL_SIGNALS: [libc::c_int; 5] = [libc::SIGSEGV, libc::SIGABRT, libc::SIGBUS, libc::SIGILL, libc::SIGFPE];

static mut MARKER_PATH_BUF: [u8; MAX_PATH_LEN] = [0; MAX_PATH_LEN];
static mut MARKER_PATH_LEN: usize = 0;
static mut OLD_ACTIONS: [MaybeUninit<libc::sigaction>; 5] = [
    MaybeUninit::uninit(),
    MaybeUninit::uninit(),
    MaybeUninit::uninit(),
    MaybeUninit::uninit(),
    MaybeUninit::uninit(),
];

static INSTALL_COUNT: AtomicUsize = AtomicUsize::new(0);
static INSTALL_LOCK: Mutex<()> = Mutex::new(());

/// Install handlers for SIGSEGV/SIGABRT/SIGBUS/SIGILL/SIGFPE. Reference
/// counted and idempotent: only the first call installs; every call must
/// be balanced by [`uninstall`].
pub fn install(cache_dir: &std::path::Path) {
    let _guard = INSTALL_LOCK.lock().unwrap();
    if INSTALL_COUNT.fetch_add(1, Ordering::SeqCst) > 0 {
        return;
    }

    let path = cache_dir.join(MARKER_FILE_NAME);
    let path_bytes = path.to_string_lossy();
    let bytes = path_bytes.as_bytes();
    let len = bytes.len().min(MAX_PATH_LEN - 1);

    // SAFETY: only touched here, under INSTALL_LOCK, before any handler
    // could possibly run (no signal action is installed yet).
    unsafe {
        MARKER_PATH_BUF[..len].copy_from_slice(&bytes[..len]);
        MARKER_PATH_BUF[len] = 0;
        MARKER_PATH_LEN = len;
    }

    for (i, &signum) in FATAL_SIGNALS.iter().enumerate() {
        let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
        action.sa_sigaction = handler as usize;
        action.sa_flags = libc::SA_SIGINFO;
        unsafe {
            libc::sigemptyset(&mut action.sa_mask);
            let mut old = MaybeUninit::<libc::sigaction>::uninit();
            libc::sigaction(signum, &action, old.as_mut_ptr());
            OLD_ACTIONS[i] = old;
        }
    }
}

/// Decrement the install reference count; only the last matching call
/// actually restores the prior signal dispositions.
pub fn uninstall() {
    let _guard = INSTALL_LOCK.lock().unwrap();
    let previous = INSTALL_COUNT.fetch_sub(1, Ordering::SeqCst);
    if previous != 1 {
        return;
    }
    for (i, &signum) in FATAL_SIGNALS.iter().enumerate() {
        unsafe {
            let old = OLD_ACTIONS[i].assume_init();
            libc::sigaction(signum, &old, std::ptr::null_mut());
        }
    }
}

/// Async-signal-safe: writes `signal:<N>\n` to the marker path using only
/// `open`, `write`, `close`, then restores the default disposition and
/// re-raises so the process terminates the way it normally would have.
extern "C" fn handler(signum: libc::c_int, _info: *mut libc::siginfo_t, _ctx: *mut libc::c_void) {
    // Manual integer-to-decimal conversion: no libc string formatting.
    let mut digits = [0u8; 12];
    let mut n = signum;
    let mut i = digits.len();
    if n == 0 {
        i -= 1;
        digits[i] = b'0';
    } else {
        while n > 0 {
            i -= 1;
            digits[i] = b'0' + (n % 10) as u8;
            n /= 10;
        }
    }

    let prefix = b"signal:";
    let suffix = b"\n";
    let mut buf = [0u8; 32];
    let mut pos = 0;
    buf[pos..pos + prefix.len()].copy_from_slice(prefix);
    pos += prefix.len();
    let digit_slice = &digits[i..];
    buf[pos..pos + digit_slice.len()].copy_from_slice(digit_slice);
    pos += digit_slice.len();
    buf[pos..pos + suffix.len()].copy_from_slice(suffix);
    pos += suffix.len();

    unsafe {
        let path_ptr = MARKER_PATH_BUF.as_ptr() as *const libc::c_char;
        let fd = libc::open(path_ptr, libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC, 0o644);
        if fd >= 0 {
            libc::write(fd, buf.as_ptr() as *const libc::c_void, pos);
            libc::close(fd);
        }

        libc::signal(signum, libc::SIG_DFL);
        libc::raise(signum);
    }
}

fn signal_name(signum: i32) -> &'static str {
    match signum {
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGABRT => "SIGABRT",
        libc::SIGBUS => "SIGBUS",
        libc::SIGILL => "SIGILL",
        libc::SIGFPE => "SIGFPE",
        _ => "UNKNOWN",
    }
}

/// Read and delete the marker left by a previous crash, if any, and turn
/// it into a synthetic fatal event.
pub fn replay(cache_dir: &std::path::Path) -> Option<Event> {
    let path = cache_dir.join(MARKER_FILE_NAME);
    let content = std::fs::read_to_string(&path).ok()?;
    let _ = std::fs::remove_file(&path);

    let signum: i32 = content.trim().strip_prefix("signal:")?.parse().ok()?;
    let name = signal_name(signum);
    let mut event = Event::exception("NativeCrash", format!("Crash: {name} (signal {signum})"));
    event.level = Level::Fatal;
    Some(event)
}
