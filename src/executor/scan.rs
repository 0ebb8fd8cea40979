//! Page sources.

use std::collections::VecDeque;

use arrow::record_batch::RecordBatch;

use crate::data::{block_from_arrow, Page};
use crate::error::Result;
use crate::executor::Operator;
use crate::memory::DriverContext;

/// Emits pages that were built ahead of time.
pub struct PageSource {
    pages: VecDeque<Page>,
}

impl PageSource {
    /// Creates a source over `pages`, emitted in order.
    #[must_use]
    pub fn new(pages: Vec<Page>) -> Self {
        PageSource {
            pages: pages.into(),
        }
    }
}

impl Operator for PageSource {
    fn next_page(&mut self) -> Result<Option<Page>> {
        Ok(self.pages.pop_front())
    }

    fn name(&self) -> &'static str {
        "PageSource"
    }
}

/// Imports Arrow record batches into pages charged to one driver context,
/// slicing each batch into pages of at most `page_size` rows.
pub struct RecordBatchSource {
    ctx: DriverContext,
    batches: VecDeque<RecordBatch>,
    page_size: usize,
    offset: usize,
}

impl RecordBatchSource {
    /// Creates a source over `batches`. A `page_size` of zero is treated as one.
    #[must_use]
    pub fn new(ctx: &DriverContext, batches: Vec<RecordBatch>, page_size: usize) -> Self {
        RecordBatchSource {
            ctx: ctx.clone(),
            batches: batches.into(),
            page_size: page_size.max(1),
            offset: 0,
        }
    }
}

impl Operator for RecordBatchSource {
    fn next_page(&mut self) -> Result<Option<Page>> {
        loop {
            let Some(batch) = self.batches.front() else {
                return Ok(None);
            };
            if self.offset >= batch.num_rows() {
                self.batches.pop_front();
                self.offset = 0;
                continue;
            }

            let len = self.page_size.min(batch.num_rows() - self.offset);
            let slice = batch.slice(self.offset, len);
            self.offset += len;

            let blocks = slice
                .columns()
                .iter()
                .map(|column| block_from_arrow(self.ctx.block_factory(), column.as_ref()))
                .collect::<Result<Vec<_>>>()?;
            return Page::with_position_count(len, blocks).map(Some);
        }
    }

    fn name(&self) -> &'static str {
        "RecordBatchSource"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType as ArrowDataType, Field, Schema};

    use super::*;
    use crate::config::DriverConfig;
    use crate::types::Value;

    fn batch(rows: i64) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("n", ArrowDataType::Int64, false),
            Field::new("s", ArrowDataType::Utf8, true),
        ]));
        let numbers: Vec<i64> = (0..rows).collect();
        let strings: Vec<Option<String>> = (0..rows)
            .map(|i| (i % 2 == 0).then(|| format!("v{i}")))
            .collect();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(numbers)),
                Arc::new(StringArray::from(strings)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_batches_are_sliced_into_pages() {
        let ctx = DriverContext::new(&DriverConfig::default());
        let mut source = RecordBatchSource::new(&ctx, vec![batch(5), batch(0), batch(2)], 2);
        let mut sizes = Vec::new();
        while let Some(page) = source.next_page().unwrap() {
            assert_eq!(page.block_count(), 2);
            sizes.push(page.position_count());
        }
        assert_eq!(sizes, vec![2, 2, 1, 2]);
        assert_eq!(ctx.outstanding_bytes(), 0);
    }

    #[test]
    fn test_imported_values() {
        let ctx = DriverContext::new(&DriverConfig::default());
        let mut source = RecordBatchSource::new(&ctx, vec![batch(3)], 10);
        let page = source.next_page().unwrap().unwrap();
        assert_eq!(page.block(0).unwrap().value(2), Value::Long(2));
        assert_eq!(page.block(1).unwrap().value(0), Value::keyword("v0"));
        assert!(page.block(1).unwrap().is_null(1));
        assert!(source.next_page().unwrap().is_none());
    }

    #[test]
    fn test_page_source_in_order() {
        let pages = vec![
            Page::with_position_count(1, vec![]).unwrap(),
            Page::with_position_count(2, vec![]).unwrap(),
        ];
        let mut source = PageSource::new(pages);
        assert_eq!(source.next_page().unwrap().unwrap().position_count(), 1);
        assert_eq!(source.next_page().unwrap().unwrap().position_count(), 2);
        assert!(source.next_page().unwrap().is_none());
    }
}
