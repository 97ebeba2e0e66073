use crate::context::QueryContext;
use crate::error::Result;
use crate::model::TimeRange;
use crate::output::{collect_matrix, ApiValue, Encoder, Writer};
use crate::parser::parse_selector;
use crate::storage::Queryable;

// selector -> Querier -> SeriesSet -> ApiValue -> Encoder -> Writer
//
// A failed select is still written out, as an encoded error, before the
// error is handed back to the caller.
pub struct Runner {
    storage: Box<dyn Queryable>,
    encoder: Box<dyn Encoder>,
    writer: Box<dyn Writer>,
}

impl Runner {
    pub fn new(
        storage: Box<dyn Queryable>,
        encoder: Box<dyn Encoder>,
        writer: Box<dyn Writer>,
    ) -> Self {
        Self {
            storage,
            encoder,
            writer,
        }
    }

    pub async fn select(
        &mut self,
        ctx: &QueryContext,
        selector: &str,
        range: TimeRange,
    ) -> Result<()> {
        let res = self.fetch(ctx, selector, range).await;

        match res {
            Ok(value) => {
                let buf = self.encoder.encode(&value)?;
                self.writer.write(&buf)?;
                Ok(())
            }
            Err(err) => {
                let buf = self.encoder.encode_error(&err)?;
                self.writer.write(&buf)?;
                Err(err)
            }
        }
    }

    async fn fetch(
        &self,
        ctx: &QueryContext,
        selector: &str,
        range: TimeRange,
    ) -> Result<ApiValue> {
        let matchers = parse_selector(selector)?;
        let querier = self.storage.querier(range)?;

        let mut set = querier.select(ctx, &matchers).await;
        let matrix = collect_matrix(set.as_mut());
        querier.close()?;

        Ok(ApiValue::Matrix(matrix?))
    }
}
