//! `sysctl(3)` access through libc on FreeBSD.

use std::ffi::CString;
use std::io;
use std::ptr;

use super::Sysctl;

/// Maximum MIB depth accepted by the kernel (`CTL_MAXNAME`).
const CTL_MAXNAME: usize = 24;

/// Reads counters from the running kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct KernelSysctl;

impl KernelSysctl {
    pub fn new() -> Self {
        Self
    }

    fn read_fixed<const N: usize>(&self, key: &str) -> io::Result<[u8; N]> {
        let name = CString::new(key).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let mut buf = [0u8; N];
        let mut len = N;

        // SAFETY: `name` is a valid NUL-terminated string and `buf`/`len`
        // describe a writable buffer of exactly `len` bytes.
        let rc = unsafe {
            libc::sysctlbyname(
                name.as_ptr(),
                buf.as_mut_ptr().cast(),
                &mut len,
                ptr::null(),
                0,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        if len != N {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unexpected size {} (expected {})", len, N),
            ));
        }
        Ok(buf)
    }

    fn name_to_mib(&self, key: &str) -> io::Result<Vec<libc::c_int>> {
        let name = CString::new(key).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let mut mib = vec![0 as libc::c_int; CTL_MAXNAME];
        let mut len = mib.len();

        // SAFETY: `mib` holds `len` writable integers; the kernel updates `len`
        // to the number of entries used.
        let rc = unsafe { libc::sysctlnametomib(name.as_ptr(), mib.as_mut_ptr(), &mut len) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        mib.truncate(len);
        Ok(mib)
    }
}

impl Sysctl for KernelSysctl {
    fn read_u64(&self, key: &str) -> io::Result<u64> {
        self.read_fixed::<8>(key).map(u64::from_ne_bytes)
    }

    fn read_u32(&self, key: &str) -> io::Result<u32> {
        self.read_fixed::<4>(key).map(u32::from_ne_bytes)
    }

    fn read_indexed(&self, key: &str, index: u32) -> io::Result<Vec<u8>> {
        let mut mib = self.name_to_mib(key)?;
        mib.push(index as libc::c_int);

        let mut len: libc::size_t = 0;
        // SAFETY: a null `oldp` asks the kernel only for the value size.
        let rc = unsafe {
            libc::sysctl(
                mib.as_ptr(),
                mib.len() as libc::c_uint,
                ptr::null_mut(),
                &mut len,
                ptr::null(),
                0,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut buf = vec![0u8; len];
        // SAFETY: `buf` is a writable buffer of `len` bytes.
        let rc = unsafe {
            libc::sysctl(
                mib.as_ptr(),
                mib.len() as libc::c_uint,
                buf.as_mut_ptr().cast(),
                &mut len,
                ptr::null(),
                0,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        buf.truncate(len);
        Ok(buf)
    }
}
