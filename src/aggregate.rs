use crate::results::Row;

/// What a request hands back on success, which also tells the driver how to
/// run it: stream rows, or execute and report the affected count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Rows,
    RowCount,
}

/// Folds row events into the payload a request completes with.
///
/// `on_row` may be called any number of times before `finish`. `finish` is
/// called at most once, when the completion event is accepted.
pub trait ResultAggregator: Send {
    type Output: Send + 'static;

    const SHAPE: ResultShape;

    fn on_row(&mut self, row: Row);

    fn finish(&mut self, rows_affected: u64) -> Self::Output;
}

/// Every row, in arrival order.
#[derive(Debug, Default)]
pub struct RowsAggregator {
    rows: Vec<Row>,
}

impl ResultAggregator for RowsAggregator {
    type Output = Vec<Row>;

    const SHAPE: ResultShape = ResultShape::Rows;

    fn on_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    fn finish(&mut self, _rows_affected: u64) -> Vec<Row> {
        std::mem::take(&mut self.rows)
    }
}

/// Zero or one row. When more than one arrives the last one is kept.
#[derive(Debug, Default)]
pub struct SingleRowAggregator {
    row: Option<Row>,
    seen: usize,
}

impl ResultAggregator for SingleRowAggregator {
    type Output = Option<Row>;

    const SHAPE: ResultShape = ResultShape::Rows;

    fn on_row(&mut self, row: Row) {
        self.seen += 1;
        self.row = Some(row);
    }

    fn finish(&mut self, _rows_affected: u64) -> Option<Row> {
        if self.seen > 1 {
            // TODO: settle with the procedure owners whether more than one
            // match should be an error instead of last-row-wins.
            tracing::warn!(
                rows = self.seen,
                "single-row request produced several rows; keeping the last"
            );
        }
        self.row.take()
    }
}

/// Rows affected as reported by the completion event. Row payloads are ignored.
#[derive(Debug, Default)]
pub struct RowCountAggregator;

impl ResultAggregator for RowCountAggregator {
    type Output = u64;

    const SHAPE: ResultShape = ResultShape::RowCount;

    fn on_row(&mut self, _row: Row) {}

    fn finish(&mut self, rows_affected: u64) -> u64 {
        rows_affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowValues;

    fn titled(title: &str) -> Row {
        Row::from_pairs([("titulo", RowValues::Text(title.into()))])
    }

    #[test]
    fn rows_keep_arrival_order() {
        let mut agg = RowsAggregator::default();
        for t in ["Alpha", "Beta", "Gamma"] {
            agg.on_row(titled(t));
        }
        let rows = agg.finish(3);
        let titles: Vec<_> = rows
            .iter()
            .filter_map(|r| r.get("titulo").and_then(RowValues::as_text))
            .collect();
        assert_eq!(titles, ["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn no_rows_is_an_empty_sequence() {
        assert!(RowsAggregator::default().finish(0).is_empty());
    }

    #[test]
    fn single_row_is_absent_without_rows() {
        assert_eq!(SingleRowAggregator::default().finish(0), None);
    }

    #[test]
    fn single_row_keeps_last() {
        let mut agg = SingleRowAggregator::default();
        agg.on_row(titled("first"));
        agg.on_row(titled("second"));
        assert_eq!(agg.finish(2), Some(titled("second")));
    }

    #[test]
    fn row_count_reports_completion_count() {
        let mut agg = RowCountAggregator;
        agg.on_row(titled("ignored"));
        assert_eq!(agg.finish(0), 0);
        assert_eq!(RowCountAggregator.finish(1), 1);
    }
}
