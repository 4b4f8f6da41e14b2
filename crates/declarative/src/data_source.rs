//! Read-only data sources.

use crate::context::{CancellationToken, Context, Operation};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::timeouts::{TIMEOUTS_ATTRIBUTE, Timeouts};
use crate::wrapper::Response;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// A typed data source: configuration in, computed attributes out.
pub trait DataSource: Send + Sync {
    type Model: Serialize + DeserializeOwned + Clone + fmt::Debug + Send;

    fn data_source_type(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn read_timeout(&self) -> Duration {
        Duration::from_secs(5 * 60)
    }

    fn read(&self, ctx: &Context, config: &Self::Model) -> Result<Self::Model>;
}

/// Object-safe data source interface driven by the host.
pub trait ManagedDataSource: Send + Sync {
    fn data_source_type(&self) -> &'static str;
    fn schema(&self) -> Schema;
    fn read(&self, config: Value, cancel: CancellationToken) -> Response;
}

pub type BoxedDataSource = Box<dyn ManagedDataSource>;

pub struct DataSourceWrapper<D> {
    inner: D,
}

impl<D: DataSource + 'static> DataSourceWrapper<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn boxed(inner: D) -> BoxedDataSource {
        Box::new(Self::new(inner))
    }

    fn run(&self, config: &Value, cancel: CancellationToken) -> Result<Value> {
        let timeout = match Timeouts::from_value(config)?.read {
            Some(raw) => humantime::parse_duration(&raw).map_err(|e| {
                Error::attribute(TIMEOUTS_ATTRIBUTE, format!("invalid read timeout {raw:?}: {e}"))
            })?,
            None => self.inner.read_timeout(),
        };
        let ctx = Context::new(self.inner.data_source_type(), Operation::Read, timeout, cancel);

        let errors = self.inner.schema().validate(config);
        if let Some(err) = errors.into_iter().next() {
            return Err(err);
        }
        let model: D::Model = serde_json::from_value(config.clone())
            .map_err(|e| Error::internal(format!("decoding configuration: {e}")))?;
        let read = self.inner.read(&ctx, &model)?;
        Ok(serde_json::to_value(read)?)
    }
}

impl<D: DataSource + 'static> ManagedDataSource for DataSourceWrapper<D> {
    fn data_source_type(&self) -> &'static str {
        self.inner.data_source_type()
    }

    fn schema(&self) -> Schema {
        self.inner.schema()
    }

    fn read(&self, config: Value, cancel: CancellationToken) -> Response {
        log::debug!("Reading data source {}", self.inner.data_source_type());
        match self.run(&config, cancel) {
            Ok(state) => Response {
                state: Some(state),
                identity: None,
                diagnostics: Diagnostics::new(),
            },
            Err(err) => {
                let mut diagnostics = Diagnostics::new();
                diagnostics.add_error("", &err);
                Response {
                    state: None,
                    identity: None,
                    diagnostics,
                }
            }
        }
    }
}
