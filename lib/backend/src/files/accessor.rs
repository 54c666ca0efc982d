use super::RdfFile;
use crate::Accessor;
use async_trait::async_trait;
use ssp_model::io::{parse_graph, serialize_graph};
use ssp_model::{
    AccessCode, AccessError, AccessResult, DataOrigin, ExpiringNamedGraph, Graph, Modification,
};
use std::io;

/// Reads, writes, and deletes RDF files.
#[derive(Debug, Default, Clone, Copy)]
pub struct RdfFileAccessor;

#[async_trait]
impl Accessor<RdfFile> for RdfFileAccessor {
    async fn get_status(&self, origin: &DataOrigin<RdfFile>) -> AccessResult {
        let graph = read_graph(origin).await?;
        Ok(ExpiringNamedGraph::never_expiring(
            origin.graph_name().into_owned(),
            graph,
        ))
    }

    async fn set_status(
        &self,
        origin: &DataOrigin<RdfFile>,
        graph: Graph,
    ) -> AccessResult<Modification> {
        let file = origin.identifier();
        let format = file.format().ok_or_else(|| unsupported_format(file))?;
        let data = serialize_graph(&graph, format)
            .map_err(|error| AccessError::internal(format!("Cannot serialize graph: {error}")))?;
        tokio::fs::write(file.path(), data)
            .await
            .map_err(|error| io_error(file, &error))?;
        Ok(Modification::Updated)
    }

    async fn delete_resource(&self, origin: &DataOrigin<RdfFile>) -> AccessResult<Modification> {
        let file = origin.identifier();
        tokio::fs::remove_file(file.path())
            .await
            .map_err(|error| io_error(file, &error))?;
        Ok(Modification::Deleted)
    }
}

/// Reads and parses the file of a data origin.
pub(super) async fn read_graph(origin: &DataOrigin<RdfFile>) -> AccessResult<Graph> {
    let file = origin.identifier();
    let format = file.format().ok_or_else(|| unsupported_format(file))?;
    let data = tokio::fs::read(file.path())
        .await
        .map_err(|error| io_error(file, &error))?;
    parse_graph(&data, format, Some(origin.graph_name().as_str()))
        .map_err(|error| AccessError::bad_gateway(format!("Malformed file {file}: {error}")))
}

fn unsupported_format(file: &RdfFile) -> AccessError {
    AccessError::new(
        AccessCode::UnsupportedContentFormat,
        format!("Unknown RDF format of {file}"),
    )
}

fn io_error(file: &RdfFile, error: &io::Error) -> AccessError {
    let code = match error.kind() {
        io::ErrorKind::NotFound => AccessCode::NotFound,
        io::ErrorKind::PermissionDenied => AccessCode::Forbidden,
        _ => AccessCode::Internal,
    };
    AccessError::new(code, format!("{file}: {error}"))
}
