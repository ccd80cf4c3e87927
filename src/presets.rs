//! Named byte budgets.
//!
//! The common upload limits people compress for: form fields that cap a
//! photo at 20 KB, portals that want "under 100 KB", messaging apps at
//! 1–2 MB. Any preset name is also accepted wherever a size is.

use crate::imaging::ByteSize;

/// A named target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub size: ByteSize,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "5kb",
        size: ByteSize::kb(5),
    },
    Preset {
        name: "10kb",
        size: ByteSize::kb(10),
    },
    Preset {
        name: "20kb",
        size: ByteSize::kb(20),
    },
    Preset {
        name: "30kb",
        size: ByteSize::kb(30),
    },
    Preset {
        name: "50kb",
        size: ByteSize::kb(50),
    },
    Preset {
        name: "100kb",
        size: ByteSize::kb(100),
    },
    Preset {
        name: "200kb",
        size: ByteSize::kb(200),
    },
    Preset {
        name: "500kb",
        size: ByteSize::kb(500),
    },
    Preset {
        name: "1mb",
        size: ByteSize::mb(1),
    },
    Preset {
        name: "2mb",
        size: ByteSize::mb(2),
    },
];

/// Look up a preset by name, case-insensitively.
pub fn find(name: &str) -> Option<ByteSize> {
    PRESETS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .map(|p| p.size)
}
