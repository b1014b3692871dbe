use crate::platform::Platform;
use crate::types::{Arch, BuildVariant, Os};

/// First entry, in list order, whose OS and architecture both match.
pub fn select_native_variant(variants: &[BuildVariant], os: Os, arch: Arch) -> Option<&BuildVariant> {
    if os == Os::Other || arch == Arch::Other {
        return None;
    }
    variants.iter().find(|v| v.os == os && v.arch == arch)
}

/// [`select_native_variant`] for the running platform.
pub fn find_native_variant(variants: &[BuildVariant]) -> Option<&BuildVariant> {
    let p = Platform::current();
    select_native_variant(variants, p.os, p.arch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(os: Os, arch: Arch, url: &str) -> BuildVariant {
        BuildVariant {
            os,
            arch,
            download_url: url.to_string(),
        }
    }

    #[test]
    fn first_full_match_wins() {
        let list = [
            v(Os::Linux, Arch::X64, "linux"),
            v(Os::Windows, Arch::X64, "first"),
            v(Os::Windows, Arch::X64, "second"),
        ];
        let got = select_native_variant(&list, Os::Windows, Arch::X64).unwrap();
        assert_eq!(got.download_url, "first");
    }

    #[test]
    fn partial_matches_are_rejected() {
        let list = [v(Os::Windows, Arch::X86, "os-only"), v(Os::Linux, Arch::X64, "arch-only")];
        assert!(select_native_variant(&list, Os::Windows, Arch::X64).is_none());
    }

    #[test]
    fn empty_list_and_unknown_platform_yield_none() {
        assert!(select_native_variant(&[], Os::Linux, Arch::X64).is_none());
        let list = [v(Os::Other, Arch::Other, "mystery")];
        assert!(select_native_variant(&list, Os::Other, Arch::Other).is_none());
    }

    #[test]
    fn running_platform_finds_its_own_entry() {
        let p = Platform::current();
        let list = [v(Os::Other, Arch::Other, "elsewhere"), v(p.os, p.arch, "native")];
        match find_native_variant(&list) {
            Some(found) => assert_eq!(found.download_url, "native"),
            None => assert!(p.os == Os::Other || p.arch == Arch::Other),
        }
    }
}
