//! IOKit service registry backend

#![allow(non_camel_case_types, non_upper_case_globals)]

use std::ffi::{CStr, CString};
use std::ptr;

use libc::{c_char, c_void, kern_return_t, mach_port_t};

use crate::sensors::ambient_light::{KernReturn, ServiceRegistry, KERN_SUCCESS};

type io_object_t = mach_port_t;
type io_service_t = io_object_t;
type io_connect_t = io_object_t;

/// `kIOMainPortDefault`
const IO_MAIN_PORT_DEFAULT: mach_port_t = 0;

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    fn IOServiceMatching(name: *const c_char) -> *mut c_void;
    fn IOServiceGetMatchingService(main_port: mach_port_t, matching: *mut c_void) -> io_service_t;
    fn IOServiceOpen(
        service: io_service_t,
        owning_task: mach_port_t,
        kind: u32,
        connect: *mut io_connect_t,
    ) -> kern_return_t;
    fn IOServiceClose(connect: io_connect_t) -> kern_return_t;
    fn IOObjectRelease(object: io_object_t) -> kern_return_t;
    fn IOConnectCallMethod(
        connection: mach_port_t,
        selector: u32,
        input: *const u64,
        input_count: u32,
        input_struct: *const c_void,
        input_struct_size: usize,
        output: *mut u64,
        output_count: *mut u32,
        output_struct: *mut c_void,
        output_struct_size: *mut usize,
    ) -> kern_return_t;
}

// libSystem; libc only offers a deprecated `mach_task_self()` wrapper
extern "C" {
    static mach_task_self_: mach_port_t;

    fn mach_error_string(error_value: kern_return_t) -> *const c_char;
}

/// Registry entry; released on drop.
pub(crate) struct ServicePort(io_service_t);

impl Drop for ServicePort {
    fn drop(&mut self) {
        unsafe { IOObjectRelease(self.0) };
    }
}

/// Open user client connection; closed on drop.
pub(crate) struct Connection(io_connect_t);

impl Drop for Connection {
    fn drop(&mut self) {
        let kr = unsafe { IOServiceClose(self.0) };
        if kr != KERN_SUCCESS {
            tracing::warn!("IOServiceClose returned 0x{:08x}", kr);
        }
    }
}

pub(crate) struct IoKitRegistry;

impl ServiceRegistry for IoKitRegistry {
    type Service = ServicePort;
    type Connection = Connection;

    fn find_service(&self, name: &str) -> Option<ServicePort> {
        let Ok(name) = CString::new(name) else {
            tracing::warn!("Service name {:?} contains a NUL byte", name);
            return None;
        };

        // IOServiceGetMatchingService consumes the matching dictionary.
        let service = unsafe {
            let matching = IOServiceMatching(name.as_ptr());
            if matching.is_null() {
                return None;
            }
            IOServiceGetMatchingService(IO_MAIN_PORT_DEFAULT, matching)
        };

        (service != 0).then(|| ServicePort(service))
    }

    fn open(&self, service: &ServicePort) -> Result<Connection, KernReturn> {
        let mut connect: io_connect_t = 0;
        let kr = unsafe { IOServiceOpen(service.0, mach_task_self_, 0, &mut connect) };
        if kr != KERN_SUCCESS {
            return Err(kr);
        }
        Ok(Connection(connect))
    }

    fn call_method(
        &self,
        connection: &Connection,
        selector: u32,
        outputs: &mut [u64],
    ) -> Result<usize, KernReturn> {
        let mut count = outputs.len() as u32;
        let kr = unsafe {
            IOConnectCallMethod(
                connection.0,
                selector,
                ptr::null(),
                0,
                ptr::null(),
                0,
                outputs.as_mut_ptr(),
                &mut count,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if kr != KERN_SUCCESS {
            return Err(kr);
        }
        Ok(count as usize)
    }

    fn describe(&self, code: KernReturn) -> String {
        let text = unsafe { mach_error_string(code) };
        if text.is_null() {
            return format!("error 0x{:08x}", code);
        }
        unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_service_not_found() {
        assert!(IoKitRegistry.find_service("LmuNoSuchService").is_none());
    }

    #[test]
    fn test_nul_in_name_not_found() {
        assert!(IoKitRegistry.find_service("Apple\0LMU").is_none());
    }

    #[test]
    fn test_describe_uses_mach_text() {
        assert_eq!(IoKitRegistry.describe(KERN_SUCCESS), "(os/kern) successful");
    }
}
