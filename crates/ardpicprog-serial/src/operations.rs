//! Whole-device operations
//!
//! These walk the device areas in a fixed order: program memory, data
//! memory, then id words and fuses. Data goes before fuses because a fuse
//! write can turn on data protection, which would then block verifying the
//! data write. Areas with an empty range are skipped.

use std::sync::Arc;

use ardpicprog_core::{AddressRange, AreaKind, DeviceProfile, HexImage, WordSource};

use crate::error::{Error, Result};
use crate::session::ProgrammerSession;
use crate::transport::Transport;

/// Resolve the device in the socket and parse its parameters
pub fn resolve_device<T: Transport>(
    session: &mut ProgrammerSession<T>,
    requested: &str,
) -> Result<Arc<DeviceProfile>> {
    let details = session.init_device(requested)?;
    let profile = DeviceProfile::from_details(&details)?;
    log::debug!(
        "Device {}: program {}, config {}, data {}, reserved {}",
        profile.device_name(),
        profile.program_range(),
        profile.config_range(),
        profile.data_range(),
        profile.reserved_range()
    );
    Ok(Arc::new(profile))
}

/// Replace the contents of `image` with the device's memory
pub fn read_image<T: Transport>(
    session: &mut ProgrammerSession<T>,
    image: &mut HexImage,
) -> Result<()> {
    image.words_mut().clear();
    let areas = image.profile().areas();
    for area in areas {
        let desc = area.kind.description();
        if area.range.is_empty() {
            log::info!("Skipped reading {}", desc);
            continue;
        }
        log::info!("Reading {}", desc);
        image
            .words_mut()
            .read_from(&mut session.source(), area.range)?;
    }
    Ok(())
}

/// Program range actually written
///
/// Unless calibration is forced, the reserved words at the end of program
/// memory are left out so the device keeps its own calibration.
pub fn program_write_range(profile: &DeviceProfile, force_calibration: bool) -> AddressRange {
    let program = profile.program_range();
    let reserved = profile.reserved_range();
    if force_calibration || reserved.is_empty() {
        program
    } else {
        AddressRange::new(program.start(), program.post().min(reserved.start()))
    }
}

/// Burn every defined word of `image` into the device
///
/// Returns the total number of words written.
pub fn write_image<T: Transport>(
    session: &mut ProgrammerSession<T>,
    image: &HexImage,
    force_calibration: bool,
) -> Result<usize> {
    let profile = image.profile();
    let mut total = 0;
    for area in profile.areas() {
        let desc = area.kind.description();
        if area.range.is_empty() {
            log::info!("Skipped burning {}", desc);
            continue;
        }
        let range = match area.kind {
            AreaKind::Program => program_write_range(profile, force_calibration),
            _ => area.range,
        };
        log::info!("Burning {}", desc);
        let count = image
            .words()
            .write_to(&mut session.sink(force_calibration), range)?;
        log::info!("{} location{}", count, if count == 1 { "" } else { "s" });
        total += count;
    }
    Ok(total)
}

/// Check whether every area of the device reads as erased
///
/// Stops at the first area that is not blank.
pub fn blank_check<T: Transport>(
    session: &mut ProgrammerSession<T>,
    profile: &DeviceProfile,
) -> Result<bool> {
    for area in profile.areas() {
        let desc = area.kind.description();
        if area.range.is_empty() {
            log::info!("Skipped blank checking {}", desc);
            continue;
        }
        log::info!("Blank checking {}", desc);
        let mut words = vec![0u16; area.range.len()];
        session.source().read_words(area.range, &mut words)?;
        if !profile.all_full_words(area.range.start(), &words) {
            log::info!("Looks non-blank");
            return Ok(false);
        }
        log::info!("Looks blank");
    }
    Ok(true)
}

/// Bulk erase the device
///
/// With `force_calibration` the calibration words are erased too, which is
/// only allowed when `image` carries calibration data to restore them from.
pub fn erase<T: Transport>(
    session: &mut ProgrammerSession<T>,
    image: Option<&HexImage>,
    force_calibration: bool,
) -> Result<()> {
    if force_calibration && !image.is_some_and(HexImage::can_force_calibration) {
        return Err(Error::Precondition(
            "Calibration data missing from input".into(),
        ));
    }
    log::info!("Erasing and removing code protection");
    session.erase(force_calibration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::MockTransport;
    use ardpicprog_core::{DeviceDetails, HexFormat};

    fn profile(pairs: &[(&str, &str)]) -> Arc<DeviceProfile> {
        let details: DeviceDetails = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(DeviceProfile::from_details(&details).unwrap())
    }

    fn session(replies: &[&[u8]]) -> ProgrammerSession<MockTransport> {
        let mut all: Vec<&[u8]> = vec![b"ProgramPIC 1.0\n"];
        all.extend_from_slice(replies);
        let mut session = ProgrammerSession::connect(MockTransport::new(&all)).unwrap();
        session.transport_mut().written.clear();
        session
    }

    #[test]
    fn test_program_write_range_preserves_calibration() {
        let p = profile(&[("ProgramRange", "0000-03FF"), ("ReservedRange", "03FF-03FF")]);
        assert_eq!(program_write_range(&p, false), AddressRange::new(0, 0x3FF));
        assert_eq!(program_write_range(&p, true), AddressRange::new(0, 0x400));

        let p = profile(&[("ProgramRange", "0000-03FF")]);
        assert_eq!(program_write_range(&p, false), AddressRange::new(0, 0x400));
    }

    #[test]
    fn test_erase_force_needs_calibration_data() {
        let p = profile(&[("ProgramRange", "0000-03FF"), ("ReservedRange", "03FF-03FF")]);
        let mut image = HexImage::new(p, HexFormat::Auto);
        let mut session = session(&[b"OK\n"]);

        let err = erase(&mut session, Some(&image), true).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        let err = erase(&mut session, None, true).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(session.transport().written.is_empty());

        image.words_mut().set(0x3FF, 0x3480);
        erase(&mut session, Some(&image), true).unwrap();
        assert_eq!(session.transport().written_str(), "ERASE NOPRESERVE\n");
    }

    #[test]
    fn test_blank_check_stops_at_first_dirty_area() {
        let p = profile(&[
            ("ProgramRange", "0000-0001"),
            ("DataRange", "2100-2101"),
            ("ConfigRange", "2000-2000"),
        ]);
        // Program reads blank, data does not
        let mut session = session(&[
            b"OK\n\x04\xFF\x3F\xFF\x3F\x00",
            b"OK\n\x04\xFF\x00\x12\x00\x00",
        ]);
        assert!(!blank_check(&mut session, &p).unwrap());
        assert_eq!(
            session.transport().written_str(),
            "READBIN 0000-0001\nREADBIN 2100-2101\n"
        );
    }

    #[test]
    fn test_write_image_skips_reserved_words() {
        let p = profile(&[
            ("ProgramRange", "0000-0003"),
            ("ReservedRange", "0003-0003"),
            ("ConfigRange", "2000-1FFF"),
            ("DataRange", "2100-20FF"),
        ]);
        let mut image = HexImage::new(p, HexFormat::Auto);
        image.words_mut().set_words(0, &[1, 2, 3, 0x3480]);
        let mut session = session(&[b"OK\n", b"OK\n", b"OK\n"]);

        let count = write_image(&mut session, &image, false).unwrap();
        assert_eq!(count, 3);
        let written = &session.transport().written;
        let header = b"WRITEBIN 0000\n";
        assert_eq!(&written[..header.len()], header);
        assert_eq!(&written[header.len()..], &[6, 1, 0, 2, 0, 3, 0, 0]);
    }
}
