//! Echo-free secret entry on the controlling terminal.

use std::io;

/// Runs `read` with terminal echo disabled on stdin, restoring it afterwards.
///
/// When stdin is not a terminal `read` runs unchanged.
pub(crate) fn without_echo<T>(read: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
    #[cfg(unix)]
    {
        let _restore = unix::EchoGuard::engage(libc::STDIN_FILENO)?;
        read()
    }
    #[cfg(not(unix))]
    {
        read()
    }
}

#[cfg(unix)]
mod unix {
    use std::io;
    use std::mem::MaybeUninit;
    use std::os::fd::RawFd;

    /// Restores the saved terminal attributes on drop.
    pub(super) struct EchoGuard {
        fd: RawFd,
        saved: libc::termios,
    }

    impl EchoGuard {
        pub(super) fn engage(fd: RawFd) -> io::Result<Option<Self>> {
            // SAFETY: `isatty` only inspects the descriptor.
            if unsafe { libc::isatty(fd) } != 1 {
                return Ok(None);
            }
            let mut saved = MaybeUninit::<libc::termios>::uninit();
            // SAFETY: `saved` is a valid out-pointer for one `termios`.
            if unsafe { libc::tcgetattr(fd, saved.as_mut_ptr()) } != 0 {
                return Err(io::Error::last_os_error());
            }
            // SAFETY: `tcgetattr` succeeded and filled the struct.
            let saved = unsafe { saved.assume_init() };
            let mut silent = saved;
            silent.c_lflag &= !libc::ECHO;
            silent.c_lflag |= libc::ECHONL;
            // SAFETY: `silent` is a fully initialised copy of the current state.
            if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw const silent) } != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Some(Self { fd, saved }))
        }
    }

    impl Drop for EchoGuard {
        fn drop(&mut self) {
            // SAFETY: restores attributes read from the same descriptor.
            unsafe {
                libc::tcsetattr(self.fd, libc::TCSANOW, &raw const self.saved);
            }
        }
    }
}
