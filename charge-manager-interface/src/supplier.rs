//! Charge supplier kinds and their ranking
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Number of charge supplier kinds
pub const SUPPLIER_COUNT: usize = 11;

/// Kind of charge source reported on a port
///
/// The discriminant is also the supplier's row in the charge table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[num_enum(error_type(name = InvalidSupplier, constructor = InvalidSupplier))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Supplier {
    /// Dedicated charger, e.g. a barrel jack
    Dedicated,
    /// USB PD negotiated contract
    Pd,
    /// Type-C Rp advertisement at 1.5A or above
    TypeC,
    /// Type-C debug accessory source
    TypeCDts,
    /// Proprietary charger signature
    Proprietary,
    /// BC1.2 dedicated charging port
    Bc12Dcp,
    /// BC1.2 charging downstream port
    Bc12Cdp,
    /// BC1.2 standard downstream port
    Bc12Sdp,
    /// Type-C Rp advertisement below 1.5A
    TypeCUnder1A5,
    /// Anything else
    Other,
    /// VBUS present without further detection
    Vbus,
}

/// Conversion error for [`Supplier`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidSupplier(pub u8);

impl Supplier {
    /// Every supplier, in charge table order
    pub const ALL: [Supplier; SUPPLIER_COUNT] = [
        Supplier::Dedicated,
        Supplier::Pd,
        Supplier::TypeC,
        Supplier::TypeCDts,
        Supplier::Proprietary,
        Supplier::Bc12Dcp,
        Supplier::Bc12Cdp,
        Supplier::Bc12Sdp,
        Supplier::TypeCUnder1A5,
        Supplier::Other,
        Supplier::Vbus,
    ];

    /// Row of this supplier in the charge table
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Supplier::Dedicated => "DEDICATED",
            Supplier::Pd => "PD",
            Supplier::TypeC => "TYPEC",
            Supplier::TypeCDts => "TYPEC_DTS",
            Supplier::Proprietary => "PROPRIETARY",
            Supplier::Bc12Dcp => "BC12_DCP",
            Supplier::Bc12Cdp => "BC12_CDP",
            Supplier::Bc12Sdp => "BC12_SDP",
            Supplier::TypeCUnder1A5 => "TYPEC_UNDER_1_5A",
            Supplier::Other => "OTHER",
            Supplier::Vbus => "VBUS",
        }
    }

    /// Type-C suppliers are mutually exclusive on a port
    pub const fn is_typec(self) -> bool {
        matches!(self, Supplier::TypeC | Supplier::TypeCDts | Supplier::TypeCUnder1A5)
    }
}

/// Static priority rank per supplier, lower is preferred
///
/// Suppliers that share a rank are ordered by available power.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SupplierPriority([u8; SUPPLIER_COUNT]);

impl SupplierPriority {
    /// Create a priority table, indexed by [`Supplier::index`]
    pub const fn new(ranks: [u8; SUPPLIER_COUNT]) -> Self {
        Self(ranks)
    }

    /// Builder method to change the rank of a single supplier
    pub fn with_rank(mut self, supplier: Supplier, rank: u8) -> Self {
        if let Some(slot) = self.0.get_mut(supplier.index()) {
            *slot = rank;
        }
        self
    }

    /// Rank of the given supplier
    pub fn rank(&self, supplier: Supplier) -> u8 {
        self.0.get(supplier.index()).copied().unwrap_or(u8::MAX)
    }
}

impl Default for SupplierPriority {
    /// Dedicated chargers first, then PD since it has the most headroom, then Type-C at 1.5A
    /// or more, then proprietary and BC1.2, then everything else.
    fn default() -> Self {
        Self::new([0, 1, 2, 2, 3, 3, 3, 3, 4, 4, 4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplier_conversion() {
        for supplier in Supplier::ALL {
            assert_eq!(Supplier::try_from(u8::from(supplier)), Ok(supplier));
            assert_eq!(supplier.index(), u8::from(supplier) as usize);
        }

        for i in (SUPPLIER_COUNT as u8)..=255 {
            assert_eq!(Supplier::try_from(i), Err(InvalidSupplier(i)));
        }
    }

    #[test]
    fn test_default_priority() {
        let priority = SupplierPriority::default();
        assert!(priority.rank(Supplier::Dedicated) < priority.rank(Supplier::Pd));
        assert!(priority.rank(Supplier::Pd) < priority.rank(Supplier::TypeC));
        assert_eq!(priority.rank(Supplier::TypeC), priority.rank(Supplier::TypeCDts));
        assert_eq!(priority.rank(Supplier::Bc12Dcp), priority.rank(Supplier::Proprietary));
        assert!(priority.rank(Supplier::Bc12Sdp) < priority.rank(Supplier::TypeCUnder1A5));
        assert_eq!(priority.rank(Supplier::Vbus), priority.rank(Supplier::Other));
    }

    #[test]
    fn test_with_rank() {
        let priority = SupplierPriority::default().with_rank(Supplier::Vbus, 0);
        assert_eq!(priority.rank(Supplier::Vbus), 0);
        assert_eq!(priority.rank(Supplier::Other), 4);
    }
}
