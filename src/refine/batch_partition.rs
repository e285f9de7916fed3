use std::collections::BTreeMap;

use crate::features::{FeatureRecord, SignalPair};
use crate::genotype_class::GenotypeClass;

/// One clustered sample within a batch group
#[derive(Clone, Debug)]
pub struct BatchMember<'a> {
    pub record: &'a FeatureRecord,
    pub signal: SignalPair,
    pub initial_class: Option<GenotypeClass>,
}

/// All clustered samples of one variant sharing a batch label
#[derive(Clone, Debug)]
pub struct BatchGroup<'a> {
    pub label: &'a str,
    pub members: Vec<BatchMember<'a>>,
}

/// Partition the feature records of one variant into per-batch clustering groups
///
/// Records without an allele balance value are dropped before grouping, so a batch consisting only
/// of such records yields no group. Groups are returned in batch label order.
///
pub fn partition_into_batch_groups(records: &[FeatureRecord]) -> Vec<BatchGroup<'_>> {
    let mut groups: BTreeMap<&str, Vec<BatchMember>> = BTreeMap::new();
    for record in records.iter() {
        let Some(signal) = record.signal else {
            continue;
        };
        groups
            .entry(record.batch_label.as_str())
            .or_default()
            .push(BatchMember {
                record,
                signal,
                initial_class: record.initial_genotype.class(),
            });
    }

    groups
        .into_iter()
        .map(|(label, members)| BatchGroup { label, members })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;
    use crate::features::{InitialGenotype, SvType};

    pub fn get_test_record(
        sample_name: &str,
        batch_label: &str,
        gt: &str,
        copy_number: f64,
        allele_balance: Option<f64>,
    ) -> FeatureRecord {
        FeatureRecord {
            variant_id: "var1".to_string(),
            sample_name: sample_name.to_string(),
            sv_type: SvType::Deletion,
            allele_frequency: 0.3,
            genotype_label: gt.to_string(),
            initial_genotype: InitialGenotype::from_vcf_genotype(gt),
            signal: allele_balance.map(|allele_balance| SignalPair {
                copy_number,
                allele_balance,
            }),
            batch_label: batch_label.to_string(),
        }
    }

    /// Three tight clusters of 10 samples each at hom-ref, het and hom-alt deletion signal
    /// positions, with matching initial genotypes
    ///
    pub fn get_separated_deletion_records(batch_label: &str) -> Vec<FeatureRecord> {
        let centers = [("0/0", 2.0, 0.02), ("0/1", 1.0, 0.5), ("1/1", 0.0, 0.95)];
        let mut records = Vec::new();
        for (center_index, (gt, cn, ab)) in centers.iter().enumerate() {
            for i in 0..10 {
                let jitter = (i as f64 - 4.5) * 0.002;
                records.push(get_test_record(
                    &format!("{batch_label}_s{center_index}_{i}"),
                    batch_label,
                    gt,
                    cn + jitter * 5.0,
                    Some((ab + jitter).max(0.0)),
                ));
            }
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::get_test_record;
    use super::*;

    #[test]
    fn test_partition_into_batch_groups() {
        let records = vec![
            get_test_record("s1", "b", "0/0", 2.0, Some(0.0)),
            get_test_record("s2", "None", "0/1", 1.0, Some(0.5)),
            get_test_record("s3", "a", "1/1", 0.0, Some(1.0)),
            get_test_record("s4", "b", "0/1", 1.0, None),
            get_test_record("s5", "c", "0/1", 1.0, None),
            get_test_record("s6", "b", "./.", 1.0, Some(0.4)),
        ];

        let groups = partition_into_batch_groups(&records);
        let labels = groups.iter().map(|x| x.label).collect::<Vec<_>>();
        assert_eq!(labels, vec!["None", "a", "b"]);

        let b = &groups[2];
        assert_eq!(b.members.len(), 2);
        assert_eq!(b.members[0].record.sample_name, "s1");
        assert_eq!(b.members[0].initial_class, Some(GenotypeClass::HomRef));
        assert_eq!(b.members[1].initial_class, None);
    }

    #[test]
    fn test_partition_without_signal() {
        let records = vec![get_test_record("s1", "None", "0/1", 5.0, None)];
        assert!(partition_into_batch_groups(&records).is_empty());
    }
}
