use std::{collections::BTreeMap, num::NonZeroUsize};

use bon::Builder;
use indexmap::IndexMap;
use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    core::{
        Cancellation,
        Error,
        OutOfDomainPolicy,
        Peak,
        RollingSum,
        Series,
        TimeBinner,
        WindowPolicy,
    },
    table::{GroupKey, Record, Scalar},
};

/// Which bins make it into the binned series.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, clap::ValueEnum, Serialize)]
pub enum BinDensity {
    /// Only the bins having at least one record: the window slides over observed bins.
    Sparse,

    /// Every bin of the day, zero-filled: the window always spans the same time.
    #[default]
    Dense,
}

/// Parameters of a peak rolling computation.
#[derive(Clone, Debug, Builder)]
#[must_use]
pub struct PeakRequest {
    /// Numeric minutes since midnight.
    #[builder(into)]
    pub time_field: String,

    /// Quantity to sum, every record counts as one when unset.
    #[builder(into)]
    pub value_field: Option<String>,

    /// Bin width in minutes.
    #[builder(default = 1)]
    pub bin_interval: u32,

    /// Window size in bins.
    #[builder(default = 60)]
    pub window: usize,

    /// Render the peak time as `H:MM`.
    #[builder(default)]
    pub format_as_clock: bool,

    #[builder(default)]
    pub density: BinDensity,

    #[builder(default)]
    pub window_policy: WindowPolicy,

    #[builder(default)]
    pub out_of_domain: OutOfDomainPolicy,
}

/// Peak of a single series along with the series, for the presentation layer.
#[derive(Clone, Debug, Default, Serialize)]
#[must_use]
pub struct PeakReport {
    pub peak: Peak,
    pub binned: Series<u32, f64>,
    pub rolling: Series<u32, Option<f64>>,
}

#[derive(Clone, Debug, Serialize)]
#[must_use]
pub struct GroupPeak {
    pub group: GroupKey,

    #[serde(flatten)]
    pub report: PeakReport,
}

/// Validated [`PeakRequest`].
#[derive(Clone, Debug)]
#[must_use]
pub struct PeakRollingEngine {
    request: PeakRequest,
    binner: TimeBinner,
    window: NonZeroUsize,
}

#[derive(Copy, Clone)]
struct Observation {
    index: usize,
    time: f64,
    value: f64,
}

impl TryFrom<PeakRequest> for PeakRollingEngine {
    type Error = Error;

    fn try_from(request: PeakRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            binner: TimeBinner::try_new(request.bin_interval)?,
            window: NonZeroUsize::new(request.window).ok_or(Error::InvalidWindow(request.window))?,
            request,
        })
    }
}

impl PeakRollingEngine {
    pub fn try_new(request: PeakRequest) -> Result<Self, Error> {
        Self::try_from(request)
    }

    pub const fn binner(&self) -> TimeBinner {
        self.binner
    }

    /// Peak over all the records.
    #[instrument(
        skip_all,
        fields(
            n_records = records.len(),
            bin_interval = self.request.bin_interval,
            window = self.request.window,
        ),
    )]
    pub fn peak<R: Record>(&self, records: &[R]) -> Result<PeakReport, Error> {
        let observations: Vec<_> = records
            .iter()
            .enumerate()
            .map(|(index, record)| self.observe(index, record))
            .collect::<Result<_, _>>()?;
        let report = self.report(&observations)?;
        info!(
            max_value = report.peak.max_value,
            max_time = %report.peak.time_label(),
            n_bins = report.binned.len(),
            "found the peak",
        );
        Ok(report)
    }

    /// Peak per group, in the order the groups first appear in the records.
    ///
    /// Records with a null group are left out. Groups are computed in parallel, each over its own
    /// bins only. The cancellation is checked before every group, and no partial result is
    /// returned.
    #[instrument(skip_all, fields(n_records = records.len(), group_field = group_field))]
    pub fn peak_by_group<R: Record + Sync>(
        &self,
        records: &[R],
        group_field: &str,
        cancellation: &Cancellation,
    ) -> Result<Vec<GroupPeak>, Error> {
        let mut groups: IndexMap<GroupKey, Vec<Observation>> = IndexMap::new();
        let mut n_ungrouped = 0_usize;
        for (index, record) in records.iter().enumerate() {
            let group = record
                .field(group_field)
                .ok_or_else(|| Error::MissingField { index, field: group_field.to_owned() })?;
            let Some(group) = GroupKey::new(group) else {
                n_ungrouped += 1;
                continue;
            };
            let observation = self.observe(index, record)?;
            groups.entry(group).or_default().push(observation);
        }
        info!(n_groups = groups.len(), n_ungrouped, "partitioned the records");

        let group_peaks: Vec<GroupPeak> = groups
            .into_iter()
            .collect_vec()
            .into_par_iter()
            .map(|(group, observations)| {
                cancellation.check()?;
                let report = self.report(&observations)?;
                debug!(
                    %group,
                    max_value = report.peak.max_value,
                    max_time = %report.peak.time_label(),
                    "found the group peak",
                );
                Ok(GroupPeak { group, report })
            })
            .collect::<Result<_, Error>>()?;
        Ok(group_peaks)
    }

    /// Resolve the fields of a single record.
    fn observe<R: Record>(&self, index: usize, record: &R) -> Result<Observation, Error> {
        let time = numeric_field(index, record, &self.request.time_field)?;
        let value = match &self.request.value_field {
            Some(value_field) => numeric_field(index, record, value_field)?,
            None => 1.0,
        };
        Ok(Observation { index, time, value })
    }

    fn report(&self, observations: &[Observation]) -> Result<PeakReport, Error> {
        let binned = self.bin(observations)?;
        let rolling = binned
            .iter()
            .copied()
            .rolling_sum(self.window, self.request.window_policy)
            .collect_vec();
        let peak = Peak::from_rolling(rolling.iter().copied(), self.request.format_as_clock);
        Ok(PeakReport { peak, binned, rolling })
    }

    /// Sum the values per bin.
    ///
    /// The series is empty when no observation falls into the day, regardless of the density.
    fn bin(&self, observations: &[Observation]) -> Result<Series<u32, f64>, Error> {
        let mut sums = BTreeMap::<u32, f64>::new();
        let mut n_excluded = 0_usize;
        for observation in observations {
            match self.binner.assign_bin(observation.time) {
                Some(bin_start) => *sums.entry(bin_start).or_default() += observation.value,
                None => match self.request.out_of_domain {
                    OutOfDomainPolicy::Exclude => n_excluded += 1,
                    OutOfDomainPolicy::Reject => {
                        return Err(Error::OutOfDomain {
                            index: observation.index,
                            time: observation.time,
                        });
                    }
                },
            }
        }
        if n_excluded != 0 {
            debug!(n_excluded, "excluded the records outside of the day");
        }
        if sums.is_empty() {
            return Ok(Series::new());
        }
        Ok(match self.request.density {
            BinDensity::Sparse => sums.into_iter().collect(),
            BinDensity::Dense => self
                .binner
                .bin_starts()
                .map(|bin_start| (bin_start, sums.get(&bin_start).copied().unwrap_or_default()))
                .collect(),
        })
    }
}

fn numeric_field<R: Record>(index: usize, record: &R, field: &str) -> Result<f64, Error> {
    match record.field(field) {
        Some(Scalar::Number(number)) if number.is_finite() => Ok(*number),
        Some(scalar) => Err(Error::NotNumeric {
            index,
            field: field.to_owned(),
            value: scalar.to_string(),
        }),
        None => Err(Error::MissingField { index, field: field.to_owned() }),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use approx::assert_abs_diff_eq;
    use indexmap::indexmap;

    use super::*;
    use crate::table::tests::table;

    type Row = IndexMap<String, Scalar>;

    fn passenger(time: f64, size: f64, pax_type: &str) -> Row {
        indexmap! {
            "PaxArrTime".to_owned() => Scalar::Number(time),
            "GrpSize".to_owned() => Scalar::Number(size),
            "PaxType".to_owned() => Scalar::from(pax_type),
        }
    }

    fn scenario() -> Vec<Row> {
        [(0.0, 5.0), (0.0, 5.0), (30.0, 3.0), (30.0, 3.0), (60.0, 2.0), (90.0, 2.0)]
            .into_iter()
            .map(|(time, size)| passenger(time, size, "SP"))
            .collect()
    }

    /// Group sizes of the arriving passengers, per minute with an hourly window.
    fn request() -> PeakRequest {
        PeakRequest::builder().time_field("PaxArrTime").value_field("GrpSize").build()
    }

    /// Same as [`request`] but over the observed bins only.
    fn sparse_request() -> PeakRequest {
        PeakRequest { density: BinDensity::Sparse, ..request() }
    }

    fn engine(request: PeakRequest) -> PeakRollingEngine {
        PeakRollingEngine::try_new(request).unwrap()
    }

    #[test]
    fn test_end_to_end() {
        let engine = engine(PeakRequest { bin_interval: 30, window: 2, ..sparse_request() });
        let report = engine.peak(&scenario()).unwrap();
        assert_eq!(report.binned, [(0, 10.0), (30, 6.0), (60, 2.0), (90, 2.0)]);
        assert_eq!(
            report.rolling,
            [(0, Some(10.0)), (30, Some(16.0)), (60, Some(8.0)), (90, Some(4.0))],
        );
        assert_abs_diff_eq!(report.peak.max_value, 16.0);
        assert_eq!(report.peak.max_time, Some(30));
        assert_eq!(report.peak.formatted_time, None);
    }

    #[test]
    fn test_dense_keeps_the_peak() {
        let engine = engine(PeakRequest { bin_interval: 30, window: 2, ..request() });
        let report = engine.peak(&scenario()).unwrap();
        assert_eq!(report.binned.len(), 48);
        assert_eq!(report.binned[4], (120, 0.0));
        assert_eq!(report.rolling[4], (120, Some(2.0)));
        assert_eq!(report.peak.max_time, Some(30));
        assert_abs_diff_eq!(report.peak.max_value, 16.0);
    }

    #[test]
    fn test_dense_window_spans_time() {
        let records = vec![passenger(0.0, 5.0, "SP"), passenger(100.0, 7.0, "SP")];

        // An hour of per-minute bins never covers records 100 minutes apart:
        let peak = engine(request()).peak(&records).unwrap().peak;
        assert_abs_diff_eq!(peak.max_value, 7.0);
        assert_eq!(peak.max_time, Some(100));

        // Whereas two observed bins are adjacent, no matter how far apart:
        let peak = engine(sparse_request()).peak(&records).unwrap().peak;
        assert_abs_diff_eq!(peak.max_value, 12.0);
        assert_eq!(peak.max_time, Some(100));
    }

    #[test]
    fn test_full_window() {
        let engine = engine(PeakRequest {
            bin_interval: 30,
            window: 3,
            window_policy: WindowPolicy::Full,
            ..sparse_request()
        });
        let report = engine.peak(&scenario()).unwrap();
        assert_eq!(report.rolling, [(0, None), (30, None), (60, Some(18.0)), (90, Some(10.0))]);
        assert_eq!(report.peak.max_time, Some(60));
    }

    #[test]
    fn test_full_window_larger_than_series() {
        let engine = engine(PeakRequest {
            bin_interval: 30,
            window: 49,
            window_policy: WindowPolicy::Full,
            ..request()
        });
        let report = engine.peak(&scenario()).unwrap();
        assert_eq!(report.rolling.len(), 48);
        assert_eq!(report.peak, Peak::default());
    }

    #[test]
    fn test_shrinking_window_larger_than_series() {
        let engine = engine(PeakRequest { bin_interval: 30, ..sparse_request() });
        let report = engine.peak(&scenario()).unwrap();
        assert_eq!(report.rolling.last(), Some(&(90, Some(20.0))));
        assert_eq!(report.peak.max_time, Some(90));
    }

    #[test]
    fn test_unbounded_window() {
        let engine = engine(PeakRequest::builder().time_field("time").window(usize::MAX).build());
        let record = indexmap! { "time".to_owned() => Scalar::Number(5.0) };
        let report = engine.peak(&[record]).unwrap();
        assert_eq!(report.rolling.last(), Some(&(1439, Some(1.0))));
        assert_abs_diff_eq!(report.peak.max_value, 1.0);
        assert_eq!(report.peak.max_time, Some(5));
    }

    #[test]
    fn test_argmax_stability() {
        let records = [(0.0, 10.0), (1.0, 20.0), (2.0, 20.0), (3.0, 5.0)]
            .into_iter()
            .map(|(time, size)| passenger(time, size, "SP"))
            .collect_vec();
        let peak = engine(PeakRequest { window: 1, ..request() }).peak(&records).unwrap().peak;
        assert_abs_diff_eq!(peak.max_value, 20.0);
        assert_eq!(peak.max_time, Some(1));
    }

    #[test]
    fn test_empty_input() {
        let report =
            engine(PeakRequest { format_as_clock: true, ..request() }).peak::<Row>(&[]).unwrap();
        assert_abs_diff_eq!(report.peak.max_value, 0.0);
        assert_eq!(report.peak.time_label(), "N/A");
        assert!(report.binned.is_empty());
        assert!(report.rolling.is_empty());

        let report = engine(sparse_request()).peak::<Row>(&[]).unwrap();
        assert!(report.binned.is_empty());
        assert_eq!(report.peak, Peak::default());
    }

    #[test]
    fn test_count_without_value_field() {
        let engine = engine(PeakRequest {
            value_field: None,
            bin_interval: 60,
            window: 1,
            ..request()
        });
        let report = engine.peak(&scenario()).unwrap();
        assert_eq!(report.binned[..3], [(0, 4.0), (60, 2.0), (120, 0.0)]);
        assert_eq!(report.peak.max_time, Some(0));
    }

    #[test]
    fn test_clock_format() {
        let records = vec![passenger(125.0, 3.0, "SP"), passenger(10.0, 1.0, "SP")];
        let engine = engine(PeakRequest { window: 1, format_as_clock: true, ..request() });
        let peak = engine.peak(&records).unwrap().peak;
        assert_eq!(peak.max_time, Some(125));
        assert_eq!(peak.formatted_time.as_deref(), Some("2:05"));
        assert_eq!(peak.time_label(), "2:05");
    }

    #[test]
    fn test_out_of_domain() {
        let records = vec![
            passenger(-1.0, 100.0, "SP"),
            passenger(5.0, 1.0, "SP"),
            passenger(1440.0, 100.0, "SP"),
        ];

        let report = engine(sparse_request()).peak(&records).unwrap();
        assert_eq!(report.binned, [(5, 1.0)]);

        let engine = engine(PeakRequest { out_of_domain: OutOfDomainPolicy::Reject, ..request() });
        assert!(matches!(engine.peak(&records), Err(Error::OutOfDomain { index: 0, .. })));
    }

    #[test]
    fn test_invalid_request() {
        assert!(matches!(
            PeakRollingEngine::try_new(PeakRequest { window: 0, ..request() }),
            Err(Error::InvalidWindow(0)),
        ));
        assert!(matches!(
            PeakRollingEngine::try_new(PeakRequest { bin_interval: 0, ..request() }),
            Err(Error::InvalidBinInterval(0)),
        ));
    }

    #[test]
    fn test_missing_field_fails_fast() {
        let mut records = scenario();
        records[3].shift_remove("GrpSize");
        assert!(matches!(
            engine(request()).peak(&records),
            Err(Error::MissingField { index: 3, field }) if field == "GrpSize",
        ));
    }

    #[test]
    fn test_not_numeric() {
        let mut records = scenario();
        records[1].insert("PaxArrTime".to_owned(), Scalar::from("noon"));
        assert!(matches!(
            engine(request()).peak(&records),
            Err(Error::NotNumeric { index: 1, value, .. }) if value == "noon",
        ));

        records[1].insert("PaxArrTime".to_owned(), Scalar::Number(f64::NAN));
        assert!(matches!(
            engine(request()).peak(&records),
            Err(Error::NotNumeric { index: 1, .. }),
        ));
    }

    #[test]
    fn test_constant_group_matches_ungrouped() {
        let engine = engine(PeakRequest { bin_interval: 30, window: 2, ..request() });
        let ungrouped = engine.peak(&scenario()).unwrap();
        let grouped =
            engine.peak_by_group(&scenario(), "PaxType", &Cancellation::default()).unwrap();
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].group, GroupKey::Text("SP".to_owned()));
        assert_eq!(grouped[0].report.peak, ungrouped.peak);
        assert_eq!(grouped[0].report.rolling, ungrouped.rolling);
    }

    #[test]
    fn test_groups_are_independent() {
        let records = vec![
            passenger(30.0, 1.0, "PE"),
            passenger(0.0, 4.0, "SP"),
            passenger(90.0, 2.0, "PE"),
            passenger(60.0, 3.0, "SP"),
            passenger(120.0, 2.0, "PE"),
        ];
        let engine = engine(PeakRequest {
            bin_interval: 30,
            window: 2,
            format_as_clock: true,
            ..sparse_request()
        });
        let grouped = engine.peak_by_group(&records, "PaxType", &Cancellation::default()).unwrap();

        // First-seen order:
        assert_eq!(grouped.iter().map(|group| group.group.to_string()).collect_vec(), ["PE", "SP"]);

        // Sparse bins: the window slides over the group's own observed bins only.
        assert_eq!(grouped[0].report.binned, [(30, 1.0), (90, 2.0), (120, 2.0)]);
        assert_abs_diff_eq!(grouped[0].report.peak.max_value, 4.0);
        assert_eq!(grouped[0].report.peak.formatted_time.as_deref(), Some("2:00"));

        assert_eq!(grouped[1].report.binned, [(0, 4.0), (60, 3.0)]);
        assert_abs_diff_eq!(grouped[1].report.peak.max_value, 7.0);
        assert_eq!(grouped[1].report.peak.formatted_time.as_deref(), Some("1:00"));
    }

    #[test]
    fn test_group_by_typed_values() {
        let table = table(
            ["time", "checkpoint"],
            vec![
                [5.0.into(), "1".into()],
                [6.0.into(), 1.0.into()],
                [7.0.into(), "1".into()],
                [8.0.into(), (-0.0).into()],
                [9.0.into(), 0.0.into()],
                [10.0.into(), Scalar::Null],
            ],
        );
        let rows = table.rows().collect_vec();
        let engine = engine(PeakRequest::builder().time_field("time").window(5).build());
        let grouped = engine.peak_by_group(&rows, "checkpoint", &Cancellation::default()).unwrap();
        assert_eq!(
            grouped.iter().map(|group| group.group.clone()).collect_vec(),
            [
                GroupKey::Text("1".to_owned()),
                GroupKey::Number(1.0.into()),
                GroupKey::Number(0.0.into()),
            ],
        );
        assert_abs_diff_eq!(grouped[0].report.peak.max_value, 2.0);
        assert_eq!(grouped[0].report.peak.max_time, Some(7));
        assert_abs_diff_eq!(grouped[2].report.peak.max_value, 2.0);
    }

    #[test]
    fn test_missing_group_field() {
        let mut records = scenario();
        records[2].shift_remove("PaxType");
        assert!(matches!(
            engine(request()).peak_by_group(&records, "PaxType", &Cancellation::default()),
            Err(Error::MissingField { index: 2, .. }),
        ));
    }

    #[test]
    fn test_cancelled() {
        let cancellation = Cancellation::default();
        cancellation.cancel();
        assert!(matches!(
            engine(request()).peak_by_group(&scenario(), "PaxType", &cancellation),
            Err(Error::Cancelled),
        ));
    }

    #[test]
    fn test_deadline_exceeded() {
        let cancellation = Cancellation::default().with_deadline(Instant::now());
        assert!(matches!(
            engine(request()).peak_by_group(&scenario(), "PaxType", &cancellation),
            Err(Error::DeadlineExceeded),
        ));
    }
}
