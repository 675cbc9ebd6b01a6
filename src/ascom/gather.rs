use super::{Method, Params, PropertyClient, PropertyResult};
use crate::Result;
use futures::future::try_join_all;
use std::collections::HashMap;

/// Results of a concurrent batch of property calls, keyed by the path as requested.
#[derive(Debug, Clone, Default, PartialEq, derive_more::Deref, derive_more::From, derive_more::IntoIterator)]
pub struct GatheredStatus(HashMap<String, PropertyResult>);

impl PropertyClient {
    /// Call every path concurrently with the same method and parameters.
    ///
    /// Calls are independent and may complete in any order. The first fault
    /// aborts the batch and is returned; with `raise_on_error` unset only
    /// transport faults can do that, device errors stay inside the results.
    pub async fn gather<P: AsRef<str>>(
        &self,
        paths: &[P],
        method: Method,
        raise_on_error: bool,
        params: &Params,
    ) -> Result<GatheredStatus> {
        let results = try_join_all(paths.iter().map(|path| async move {
            let result = self
                .call_property(path.as_ref(), method, params, raise_on_error)
                .await?;
            Ok::<_, crate::Error>((path.as_ref().to_owned(), result))
        }))
        .await?;

        Ok(GatheredStatus(results.into_iter().collect()))
    }
}
