//! Host platform detection for runtime downloads.

/// CPU architecture of the machine the artifact is built for.
///
/// Names follow the Node.js distribution naming, which is what the runtime
/// URL template needs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arch {
    /// x86_64 / AMD64
    X64,
    /// 32-bit x86
    X86,
    /// AArch64 / ARM64
    Arm64,
    /// 32-bit ARM with hard float
    Armv7l,
    /// 64-bit little-endian POWER
    Ppc64le,
    /// IBM Z
    S390x,
}

impl Arch {
    /// Detects the host architecture.
    pub fn host() -> Option<Self> {
        Self::from_rust_arch(std::env::consts::ARCH)
    }

    /// Maps a Rust `target_arch` value.
    pub fn from_rust_arch(arch: &str) -> Option<Self> {
        match arch {
            "x86_64" => Some(Arch::X64),
            "x86" => Some(Arch::X86),
            "aarch64" => Some(Arch::Arm64),
            "arm" => Some(Arch::Armv7l),
            "powerpc64" => Some(Arch::Ppc64le),
            "s390x" => Some(Arch::S390x),
            _ => None,
        }
    }

    /// Name used in runtime distribution file names.
    pub fn dist_name(self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::X86 => "x86",
            Arch::Arm64 => "arm64",
            Arch::Armv7l => "armv7l",
            Arch::Ppc64le => "ppc64le",
            Arch::S390x => "s390x",
        }
    }
}

/// Operating system of the machine the artifact is built for.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Os {
    /// Linux
    Linux,
    /// macOS
    Darwin,
}

impl Os {
    /// Detects the host OS.
    pub fn host() -> Option<Self> {
        Self::from_rust_os(std::env::consts::OS)
    }

    /// Maps a Rust `target_os` value.
    pub fn from_rust_os(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Os::Linux),
            "macos" => Some(Os::Darwin),
            _ => None,
        }
    }

    /// Name used in runtime distribution file names.
    pub fn dist_name(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_names_map_to_dist_names() {
        assert_eq!(Arch::from_rust_arch("x86_64").map(Arch::dist_name), Some("x64"));
        assert_eq!(Arch::from_rust_arch("aarch64").map(Arch::dist_name), Some("arm64"));
        assert_eq!(Arch::from_rust_arch("mips"), None);
        assert_eq!(Os::from_rust_os("macos").map(Os::dist_name), Some("darwin"));
        assert_eq!(Os::from_rust_os("windows"), None);
    }
}
