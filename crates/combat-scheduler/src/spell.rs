//! Spell metadata and resource costs consumed from the content layer.
//!
//! The scheduler never mutates mana or inventory. It reads static spell data
//! through [`SpellCatalog`] and tells the caller what to deduct via
//! [`ResourceCost`] values carried in notices.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a spell definition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpellId(u32);

impl SpellId {
    /// Creates a spell identifier.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spell:{}", self.0)
    }
}

/// Where the caster is drawing the spell from.
///
/// The source only changes what is consumed on commit; timing and
/// cancellation are identical for every source.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellSource {
    /// Cast from a spellbook: mana plus reagents.
    #[default]
    Book,
    /// Read from a scroll: mana plus the scroll itself.
    Scroll,
    /// Released from a wand: one charge, no mana.
    Wand,
}

/// Resources committed by an action.
///
/// A zero cost means nothing is forfeited if the action is cancelled.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceCost {
    /// Mana points.
    pub mana: u32,
    /// Reagent units.
    pub reagents: u32,
    /// Whether a scroll is consumed.
    pub scroll: bool,
    /// Item charges (wands).
    pub charges: u32,
    /// Bandages.
    pub bandages: u32,
}

impl ResourceCost {
    /// No resources.
    pub const NONE: Self = Self {
        mana: 0,
        reagents: 0,
        scroll: false,
        charges: 0,
        bandages: 0,
    };

    /// A single bandage.
    pub const ONE_BANDAGE: Self = Self {
        bandages: 1,
        ..Self::NONE
    };

    /// A single item charge.
    pub const ONE_CHARGE: Self = Self {
        charges: 1,
        ..Self::NONE
    };

    /// Returns true if nothing is consumed.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.mana == 0
            && self.reagents == 0
            && !self.scroll
            && self.charges == 0
            && self.bandages == 0
    }
}

/// Static definition of a spell.
///
/// # Example
///
/// ```
/// use combat_scheduler::spell::{SpellId, SpellMeta, SpellSource};
///
/// let magic_arrow = SpellMeta::new(SpellId::new(5), 1, 500).with_mana(4).with_reagents(2);
///
/// // 25% maximum reduction at full skill.
/// assert_eq!(magic_arrow.cast_delay_ms(100, 25), 375);
/// assert_eq!(magic_arrow.cast_delay_ms(0, 25), 500);
///
/// let cost = magic_arrow.cost_for(SpellSource::Scroll);
/// assert!(cost.scroll);
/// assert_eq!(cost.reagents, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellMeta {
    /// Spell identifier.
    pub id: SpellId,
    /// Circle (tier) of the spell, 1-based.
    pub circle: u8,
    /// Nominal cast time in milliseconds before skill reduction.
    pub base_delay_ms: u32,
    /// Mana cost.
    pub mana: u32,
    /// Reagent units consumed when cast from a book.
    pub reagents: u32,
}

impl SpellMeta {
    /// Creates a spell with no resource cost.
    #[must_use]
    pub const fn new(id: SpellId, circle: u8, base_delay_ms: u32) -> Self {
        Self {
            id,
            circle,
            base_delay_ms,
            mana: 0,
            reagents: 0,
        }
    }

    /// Sets the mana cost (builder pattern).
    #[must_use]
    pub const fn with_mana(mut self, mana: u32) -> Self {
        self.mana = mana;
        self
    }

    /// Sets the reagent count (builder pattern).
    #[must_use]
    pub const fn with_reagents(mut self, reagents: u32) -> Self {
        self.reagents = reagents;
        self
    }

    /// Cast delay after skill reduction.
    ///
    /// `skill` is on a 0-100 scale and clamped. At full skill the delay is
    /// reduced by `max_reduction_pct` percent. Integer arithmetic only, so the
    /// result is identical on every platform.
    #[must_use]
    pub fn cast_delay_ms(&self, skill: u32, max_reduction_pct: u32) -> u64 {
        let base = u64::from(self.base_delay_ms);
        let skill = u64::from(skill.min(100));
        let pct = u64::from(max_reduction_pct.min(100));
        base - base * pct * skill / 10_000
    }

    /// Resources consumed when this spell commits from `source`.
    #[must_use]
    pub const fn cost_for(&self, source: SpellSource) -> ResourceCost {
        match source {
            SpellSource::Book => ResourceCost {
                mana: self.mana,
                reagents: self.reagents,
                ..ResourceCost::NONE
            },
            SpellSource::Scroll => ResourceCost {
                mana: self.mana,
                scroll: true,
                ..ResourceCost::NONE
            },
            SpellSource::Wand => ResourceCost::ONE_CHARGE,
        }
    }
}

/// Read-only lookup of spell definitions, keyed by [`SpellId`].
pub trait SpellCatalog {
    /// Returns the definition for `id`, if known.
    fn spell(&self, id: SpellId) -> Option<&SpellMeta>;
}

/// In-memory [`SpellCatalog`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpellBook {
    spells: BTreeMap<SpellId, SpellMeta>,
}

impl SpellBook {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a definition.
    pub fn insert(&mut self, meta: SpellMeta) {
        self.spells.insert(meta.id, meta);
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spells.len()
    }

    /// Returns true if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }
}

impl FromIterator<SpellMeta> for SpellBook {
    fn from_iter<I: IntoIterator<Item = SpellMeta>>(iter: I) -> Self {
        let mut book = Self::new();
        for meta in iter {
            book.insert(meta);
        }
        book
    }
}

impl SpellCatalog for SpellBook {
    fn spell(&self, id: SpellId) -> Option<&SpellMeta> {
        self.spells.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod delay_tests {
        use super::*;

        #[test]
        fn circle_one_at_full_skill_is_375() {
            let spell = SpellMeta::new(SpellId::new(1), 1, 500);
            assert_eq!(spell.cast_delay_ms(100, 25), 375);
        }

        #[test]
        fn circle_one_at_zero_skill_is_base() {
            let spell = SpellMeta::new(SpellId::new(1), 1, 500);
            assert_eq!(spell.cast_delay_ms(0, 25), 500);
        }

        #[test]
        fn skill_above_scale_is_clamped() {
            let spell = SpellMeta::new(SpellId::new(1), 1, 500);
            assert_eq!(spell.cast_delay_ms(250, 25), 375);
        }

        #[test]
        fn half_skill_halves_reduction() {
            let spell = SpellMeta::new(SpellId::new(1), 1, 2000);
            assert_eq!(spell.cast_delay_ms(50, 25), 1750);
        }
    }

    mod cost_tests {
        use super::*;

        #[test]
        fn book_costs_mana_and_reagents() {
            let spell = SpellMeta::new(SpellId::new(1), 3, 1000)
                .with_mana(9)
                .with_reagents(3);
            let cost = spell.cost_for(SpellSource::Book);
            assert_eq!(cost.mana, 9);
            assert_eq!(cost.reagents, 3);
            assert!(!cost.scroll);
        }

        #[test]
        fn wand_costs_one_charge() {
            let spell = SpellMeta::new(SpellId::new(1), 3, 1000).with_mana(9);
            assert_eq!(spell.cost_for(SpellSource::Wand), ResourceCost::ONE_CHARGE);
        }

        #[test]
        fn none_is_free() {
            assert!(ResourceCost::NONE.is_free());
            assert!(!ResourceCost::ONE_BANDAGE.is_free());
        }
    }

    #[test]
    fn spell_book_lookup() {
        let book: SpellBook = [
            SpellMeta::new(SpellId::new(1), 1, 500),
            SpellMeta::new(SpellId::new(2), 2, 750),
        ]
        .into_iter()
        .collect();

        assert_eq!(book.len(), 2);
        assert_eq!(book.spell(SpellId::new(2)).map(|s| s.circle), Some(2));
        assert!(book.spell(SpellId::new(3)).is_none());
    }

    #[test]
    fn spell_meta_is_serializable() {
        let spell = SpellMeta::new(SpellId::new(4), 1, 500).with_mana(4);
        let json = serde_json::to_string(&spell).unwrap();
        let back: SpellMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spell);
    }
}
