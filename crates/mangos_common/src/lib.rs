//! Protocol values shared between the MaNGOS tools.
//!
//! The world server reports the outcome of every melee swing with a [`HitInfo`] flag set. The
//! combat code picks one [`AttackHitState`] per swing and sends the flags it maps to.

use derive_more::derive::{BitAnd, BitOr, Display, From, Into};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Flags describing one melee swing, as sent in `SMSG_ATTACKERSTATEUPDATE`
#[derive(Default, Copy, Clone, PartialEq, Eq, Hash, BitAnd, BitOr, From, Into)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitInfo(u32);

impl HitInfo {
    /// Plain swing with no flags set
    pub const NORMAL_SWING: HitInfo = HitInfo(0x0);
    /// Unknown
    pub const UNK: HitInfo = HitInfo(0x1);
    /// Play the hit animation on the victim
    pub const HIT_ANIMATION: HitInfo = HitInfo(0x2);
    /// Swing of the off hand weapon
    pub const LEFT_SWING: HitInfo = HitInfo(0x4);
    /// Ranged attack
    pub const RANGED: HitInfo = HitInfo(0x8);
    /// Swing missed
    pub const MISS: HitInfo = HitInfo(0x10);
    /// Part of the damage was absorbed
    pub const ABSORB: HitInfo = HitInfo(0x20);
    /// Part of the damage was resisted
    pub const RESIST: HitInfo = HitInfo(0x40);
    /// Unknown
    pub const UNK2: HitInfo = HitInfo(0x100);
    /// Critical hit
    pub const CRITICAL_HIT: HitInfo = HitInfo(0x200);
    /// Part of the damage was blocked
    pub const BLOCK: HitInfo = HitInfo(0x800);
    /// Unknown
    pub const UNK3: HitInfo = HitInfo(0x2000);
    /// Crushing blow
    pub const CRUSHING: HitInfo = HitInfo(0x8000);
    /// Shares its value with [`HitInfo::NO_ACTION`], the client tells them apart by context
    pub const GLANCING: HitInfo = HitInfo(0x10000);
    /// Shares its value with [`HitInfo::GLANCING`]
    pub const NO_ACTION: HitInfo = HitInfo(0x10000);
    /// Swing without the hit sound
    pub const SWING_NO_HIT_SOUND: HitInfo = HitInfo(0x80000);

    // NO_ACTION is left out, any flag set matching it also matches GLANCING
    const NAMES: [(&'static str, HitInfo); 14] = [
        ("UNK", Self::UNK),
        ("HIT_ANIMATION", Self::HIT_ANIMATION),
        ("LEFT_SWING", Self::LEFT_SWING),
        ("RANGED", Self::RANGED),
        ("MISS", Self::MISS),
        ("ABSORB", Self::ABSORB),
        ("RESIST", Self::RESIST),
        ("UNK2", Self::UNK2),
        ("CRITICAL_HIT", Self::CRITICAL_HIT),
        ("BLOCK", Self::BLOCK),
        ("UNK3", Self::UNK3),
        ("CRUSHING", Self::CRUSHING),
        ("GLANCING", Self::GLANCING),
        ("SWING_NO_HIT_SOUND", Self::SWING_NO_HIT_SOUND),
    ];

    /// Raw value of the flags
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Whether every flag in `other` is set
    pub const fn contains(&self, other: HitInfo) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for HitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HitInfo({:#x}: {})", self.0, self)
    }
}

impl fmt::Display for HitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NORMAL_SWING");
        }

        let mut rest = self.0;
        let mut first = true;
        for (name, flag) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                rest &= !flag.0;
                first = false;
            }
        }
        if rest != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "{rest:#x}")?;
        }
        Ok(())
    }
}

/// Outcome of one melee swing
#[derive(Display, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttackHitState {
    #[display("unarmed")]
    Unarmed,
    #[display("normal")]
    Normal,
    #[display("normal (offhand)")]
    NormalOffhand,
    #[display("miss")]
    Miss,
    #[display("miss (offhand)")]
    MissOffhand,
    #[display("critical")]
    Crit,
    #[display("critical (offhand)")]
    CritOffhand,
    #[display("resist")]
    Resist,
    #[display("crushing blow")]
    CrushingBlow,
    #[display("glancing blow")]
    GlancingBlow,
}

impl AttackHitState {
    /// The flags sent for this outcome
    pub const fn hit_info(self) -> HitInfo {
        let bits = match self {
            AttackHitState::Unarmed => HitInfo::NORMAL_SWING.0,
            AttackHitState::Normal => HitInfo::HIT_ANIMATION.0,
            AttackHitState::NormalOffhand => HitInfo::HIT_ANIMATION.0 | HitInfo::LEFT_SWING.0,
            AttackHitState::Miss => HitInfo::MISS.0,
            AttackHitState::MissOffhand => HitInfo::MISS.0 | HitInfo::LEFT_SWING.0,
            AttackHitState::Crit => HitInfo::CRITICAL_HIT.0,
            AttackHitState::CritOffhand => HitInfo::CRITICAL_HIT.0 | HitInfo::LEFT_SWING.0,
            AttackHitState::Resist => HitInfo::RESIST.0,
            AttackHitState::CrushingBlow => HitInfo::CRUSHING.0,
            AttackHitState::GlancingBlow => HitInfo::GLANCING.0,
        };
        HitInfo(bits)
    }

    /// Whether the swing came from the offhand weapon
    pub const fn is_offhand(self) -> bool {
        self.hit_info().contains(HitInfo::LEFT_SWING)
    }
}

impl From<AttackHitState> for HitInfo {
    fn from(value: AttackHitState) -> Self {
        value.hit_info()
    }
}
