use strum::EnumCount;

/// The three diploid genotype classes used for clustering
///
/// Class order is fixed, and is used both for per-class table indexing and to resolve arg-max ties
/// in favor of the lower class.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, strum::EnumCount, strum::FromRepr)]
#[repr(usize)]
pub enum GenotypeClass {
    HomRef,
    Het,
    HomAlt,
}

/// All genotype classes in index order
pub const ALL_GENOTYPE_CLASSES: [GenotypeClass; GenotypeClass::COUNT] = [
    GenotypeClass::HomRef,
    GenotypeClass::Het,
    GenotypeClass::HomAlt,
];

impl GenotypeClass {
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Class number used in diagnostic output (1 = hom-ref, 2 = het, 3 = hom-alt)
    pub fn code(&self) -> u8 {
        *self as u8 + 1
    }

    pub fn vcf_genotype(&self) -> &'static str {
        match self {
            GenotypeClass::HomRef => "0/0",
            GenotypeClass::Het => "0/1",
            GenotypeClass::HomAlt => "1/1",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_order() {
        for (index, class) in ALL_GENOTYPE_CLASSES.iter().enumerate() {
            assert_eq!(class.index(), index);
            assert_eq!(GenotypeClass::from_repr(index), Some(*class));
        }
        assert!(GenotypeClass::HomRef < GenotypeClass::Het);
        assert!(GenotypeClass::Het < GenotypeClass::HomAlt);
    }

    #[test]
    fn test_class_labels() {
        assert_eq!(GenotypeClass::Het.code(), 2);
        assert_eq!(GenotypeClass::HomAlt.vcf_genotype(), "1/1");
        assert_eq!(GenotypeClass::HomRef.code(), 1);
    }
}
