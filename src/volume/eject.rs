//! Platform volume ejection
//!
//! - Linux: `udisksctl unmount` + `udisksctl power-off`, falling back to `umount`
//! - macOS: `diskutil eject`
//! - Windows: lock, dismount, allow removal and eject through `DeviceIoControl`

use log::{info, warn};

use super::traits::{Volume, VolumeEjector};

/// Ejects volumes using the host's native tools
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEjector;

impl SystemEjector {
    pub fn new() -> Self {
        Self
    }
}

impl VolumeEjector for SystemEjector {
    fn eject(&self, volume: &Volume) -> bool {
        info!("Ejecting {}", volume);

        match platform::eject(volume) {
            Ok(()) => {
                info!("Ejected {}", volume);
                true
            }
            Err(e) => {
                warn!("Failed to eject {}: {}", volume, e);
                false
            }
        }
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::Volume;
    use log::{debug, warn};
    use std::process::Command;

    pub fn eject(volume: &Volume) -> Result<(), String> {
        if volume.device.starts_with("/dev/") {
            match run("udisksctl", &["unmount", "-b", &volume.device]) {
                Ok(()) => {
                    // Unmounted is good enough; power-off is a courtesy.
                    if let Err(e) = run("udisksctl", &["power-off", "-b", &volume.device]) {
                        debug!("udisksctl power-off failed: {}", e);
                    }
                    return Ok(());
                }
                Err(e) => warn!("udisksctl unmount failed: {}", e),
            }
        }

        let root = volume.root.to_string_lossy();
        run("umount", &[root.as_ref()])
    }

    fn run(program: &str, args: &[&str]) -> Result<(), String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| format!("Failed to execute {}: {}", program, e))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(format!("{} exited with {}: {}", program, output.status, stderr.trim()))
        }
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::Volume;
    use std::process::Command;

    pub fn eject(volume: &Volume) -> Result<(), String> {
        let output = Command::new("diskutil")
            .arg("eject")
            .arg(&volume.root)
            .output()
            .map_err(|e| format!("Failed to execute diskutil: {}", e))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(stderr.trim().to_string())
        }
    }
}

#[cfg(windows)]
mod platform {
    use super::Volume;
    use log::debug;
    use std::ffi::c_void;
    use std::thread;
    use std::time::Duration;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{CloseHandle, GENERIC_READ, GENERIC_WRITE, HANDLE};
    use windows::Win32::Storage::FileSystem::{
        CreateFileW, FILE_FLAGS_AND_ATTRIBUTES, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
    };
    use windows::Win32::System::Ioctl::{
        FSCTL_DISMOUNT_VOLUME, FSCTL_LOCK_VOLUME, IOCTL_STORAGE_EJECT_MEDIA,
        IOCTL_STORAGE_MEDIA_REMOVAL,
    };
    use windows::Win32::System::IO::DeviceIoControl;

    /// Lock attempts before giving up
    const LOCK_ATTEMPTS: u32 = 10;

    /// Wait between lock attempts
    const LOCK_RETRY_DELAY: Duration = Duration::from_millis(500);

    /// Owns a volume handle and closes it on drop
    struct VolumeHandle(HANDLE);

    impl Drop for VolumeHandle {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }

    impl VolumeHandle {
        fn open(volume: &Volume) -> Result<Self, String> {
            let root = volume.root_for_template();
            let drive = root.trim_end_matches(':');
            if drive.len() != 1 {
                return Err(format!("'{}' is not a drive letter", root));
            }

            let path: Vec<u16> = format!("\\\\.\\{}:", drive)
                .encode_utf16()
                .chain(std::iter::once(0))
                .collect();

            let handle = unsafe {
                CreateFileW(
                    PCWSTR(path.as_ptr()),
                    GENERIC_READ.0 | GENERIC_WRITE.0,
                    FILE_SHARE_READ | FILE_SHARE_WRITE,
                    None,
                    OPEN_EXISTING,
                    FILE_FLAGS_AND_ATTRIBUTES(0),
                    HANDLE::default(),
                )
            }
            .map_err(|e| format!("Failed to open volume: {}", e))?;

            Ok(Self(handle))
        }

        fn control(&self, code: u32, input: Option<&[u8]>) -> windows::core::Result<()> {
            let mut returned = 0u32;
            unsafe {
                DeviceIoControl(
                    self.0,
                    code,
                    input.map(|bytes| bytes.as_ptr() as *const c_void),
                    input.map_or(0, |bytes| bytes.len() as u32),
                    None,
                    0,
                    Some(&mut returned),
                    None,
                )
            }
        }

        fn lock(&self) -> Result<(), String> {
            let mut last_error = String::new();
            for attempt in 1..=LOCK_ATTEMPTS {
                match self.control(FSCTL_LOCK_VOLUME, None) {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        debug!("Lock attempt {}/{} failed: {}", attempt, LOCK_ATTEMPTS, e);
                        last_error = e.to_string();
                    }
                }
                thread::sleep(LOCK_RETRY_DELAY);
            }
            Err(format!("Could not lock volume: {}", last_error))
        }
    }

    pub fn eject(volume: &Volume) -> Result<(), String> {
        let handle = VolumeHandle::open(volume)?;

        handle.lock()?;
        handle
            .control(FSCTL_DISMOUNT_VOLUME, None)
            .map_err(|e| format!("Dismount failed: {}", e))?;

        // PREVENT_MEDIA_REMOVAL { PreventMediaRemoval: FALSE }
        handle
            .control(IOCTL_STORAGE_MEDIA_REMOVAL, Some(&[0u8]))
            .map_err(|e| format!("Allowing removal failed: {}", e))?;
        handle
            .control(IOCTL_STORAGE_EJECT_MEDIA, None)
            .map_err(|e| format!("Eject failed: {}", e))?;

        Ok(())
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
mod platform {
    use super::Volume;

    pub fn eject(_volume: &Volume) -> Result<(), String> {
        Err("Volume ejection is not supported on this platform".to_string())
    }
}
