// Copyright (c) 2017-2024 Rene van der Meer
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

// User and group lookups for the sysfs permission checks.

use std::ffi::CString;
use std::ptr;

// Find user ID for specified user
pub fn user_to_uid(name: &str) -> Option<u32> {
    let name_cstr = CString::new(name).ok()?;
    let mut buf = [0 as libc::c_char; 4096];
    let mut res: *mut libc::passwd = ptr::null_mut();
    let mut pwd = libc::passwd {
        pw_name: ptr::null_mut(),
        pw_passwd: ptr::null_mut(),
        pw_uid: 0,
        pw_gid: 0,
        pw_gecos: ptr::null_mut(),
        pw_dir: ptr::null_mut(),
        pw_shell: ptr::null_mut(),
    };

    let found = unsafe {
        libc::getpwnam_r(
            name_cstr.as_ptr(),
            &mut pwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut res,
        ) == 0
            && !res.is_null()
    };

    if found {
        Some(pwd.pw_uid)
    } else {
        None
    }
}

// Find group ID for specified group
pub fn group_to_gid(name: &str) -> Option<u32> {
    let name_cstr = CString::new(name).ok()?;
    let mut buf = [0 as libc::c_char; 4096];
    let mut res: *mut libc::group = ptr::null_mut();
    let mut grp = libc::group {
        gr_name: ptr::null_mut(),
        gr_passwd: ptr::null_mut(),
        gr_gid: 0,
        gr_mem: ptr::null_mut(),
    };

    let found = unsafe {
        libc::getgrnam_r(
            name_cstr.as_ptr(),
            &mut grp,
            buf.as_mut_ptr(),
            buf.len(),
            &mut res,
        ) == 0
            && !res.is_null()
    };

    if found {
        Some(grp.gr_gid)
    } else {
        None
    }
}

// Running as root or effective root skips the udev permission wait
pub fn is_root() -> bool {
    match user_to_uid("root") {
        Some(root_uid) => unsafe { libc::getuid() == root_uid || libc::geteuid() == root_uid },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_exists() {
        assert_eq!(user_to_uid("root"), Some(0));
        assert_eq!(group_to_gid("root"), Some(0));
    }

    #[test]
    fn unknown_names() {
        assert_eq!(user_to_uid("no-such-user-servosweep"), None);
        assert_eq!(user_to_uid("nul\0byte"), None);
        assert_eq!(group_to_gid("no-such-group-servosweep"), None);
    }
}
