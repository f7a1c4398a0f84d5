//! Printer profile resolution policy

use shared::{PrinterProfile, TransportType};

/// Pick the profile a print call goes to
///
/// First match wins:
/// 1. the enabled default of the preferred transport type
/// 2. the last-used profile, if still enabled
/// 3. any enabled default profile
/// 4. the first enabled profile in store order
///
/// `None` means no printer is configured.
pub fn resolve_profile<'a>(
    profiles: &'a [PrinterProfile],
    last_used_id: Option<&str>,
    preferred: Option<TransportType>,
) -> Option<&'a PrinterProfile> {
    if let Some(preferred) = preferred
        && let Some(p) = profiles
            .iter()
            .find(|p| p.transport_type == preferred && p.is_default && p.is_selectable())
    {
        return Some(p);
    }

    if let Some(last_id) = last_used_id
        && let Some(p) = profiles
            .iter()
            .find(|p| p.id == last_id && p.is_selectable())
    {
        return Some(p);
    }

    profiles
        .iter()
        .find(|p| p.is_default && p.is_selectable())
        .or_else(|| profiles.iter().find(|p| p.is_selectable()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lan_default() -> PrinterProfile {
        PrinterProfile::new(TransportType::Lan, "lan").with_default(true)
    }

    fn bt() -> PrinterProfile {
        PrinterProfile::new(TransportType::Bluetooth, "bt")
    }

    #[test]
    fn test_last_used_beats_other_defaults() {
        let profiles = vec![lan_default(), bt()];
        let picked = resolve_profile(&profiles, Some(&profiles[1].id), None).unwrap();
        assert_eq!(picked.id, profiles[1].id);
    }

    #[test]
    fn test_disabled_last_used_falls_back_to_default() {
        let profiles = vec![lan_default(), bt().with_enabled(false)];
        let picked = resolve_profile(&profiles, Some(&profiles[1].id), None).unwrap();
        assert_eq!(picked.id, profiles[0].id);
    }

    #[test]
    fn test_preferred_type_default_wins() {
        let usb = PrinterProfile::new(TransportType::Usb, "usb").with_default(true);
        let profiles = vec![lan_default(), bt(), usb];
        let picked =
            resolve_profile(&profiles, Some(&profiles[1].id), Some(TransportType::Usb)).unwrap();
        assert_eq!(picked.id, profiles[2].id);

        // preferred type without an enabled default is ignored
        let picked =
            resolve_profile(&profiles, Some(&profiles[1].id), Some(TransportType::CloudSdk))
                .unwrap();
        assert_eq!(picked.id, profiles[1].id);
    }

    #[test]
    fn test_first_enabled_then_none() {
        let profiles = vec![bt().with_enabled(false), bt(), bt()];
        let picked = resolve_profile(&profiles, Some("gone"), None).unwrap();
        assert_eq!(picked.id, profiles[1].id);

        let disabled = vec![lan_default().with_enabled(false)];
        assert!(resolve_profile(&disabled, None, Some(TransportType::Lan)).is_none());
        assert!(resolve_profile(&[], None, None).is_none());
    }
}
