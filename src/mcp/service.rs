//! MCP service implementation using rmcp.
//!
//! This module defines the DbService struct with the database tools and the
//! table resources of the default target, exposed via the MCP protocol using
//! the rmcp framework's macros.

use crate::db::{MySqlRegistry, QueryExecutor};
use crate::error::DbError;
use crate::tools::gate::CommandGate;
use crate::tools::query::{QueryInput, QueryOutput, QueryToolHandler};
use crate::tools::schema::{
    DescribeTableInput, DescribeTableOutput, ListDatabasesOutput, SchemaToolHandler,
};
use crate::tools::statement_guard::StatementGuard;
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        AnnotateAble, Implementation, ListResourcesResult, PaginatedRequestParam,
        ProtocolVersion, RawResource, ReadResourceRequestParam, ReadResourceResult,
        ResourceContents, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct DbService {
    registry: Arc<MySqlRegistry>,
    query_handler: Arc<QueryToolHandler>,
    schema_handler: Arc<SchemaToolHandler>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    /// Create a new DbService instance.
    ///
    /// # Arguments
    ///
    /// * `registry` - Shared pool registry; also owns the target store
    /// * `gate` - Command allow-list applied to every `query` call
    /// * `guard` - Optional single-statement check layered after the gate
    /// * `executor` - Row limit and timeout settings
    pub fn new(
        registry: Arc<MySqlRegistry>,
        gate: Arc<CommandGate>,
        guard: Option<StatementGuard>,
        executor: QueryExecutor,
    ) -> Self {
        Self {
            query_handler: Arc::new(QueryToolHandler::new(
                registry.clone(),
                gate,
                guard,
                executor.clone(),
            )),
            schema_handler: Arc::new(SchemaToolHandler::new(registry.clone(), executor)),
            registry,
            tool_router: Self::tool_router(),
        }
    }

    pub fn registry(&self) -> &Arc<MySqlRegistry> {
        &self.registry
    }
}

#[tool_router]
impl DbService {
    #[tool(
        description = "List the configured database targets.\nReturns each target's name, host, schema, connection limit, whether its pool is open, and which target is the default.\nUse a returned `name` as the `database` argument of the other tools."
    )]
    async fn list_databases(&self) -> Json<ListDatabasesOutput> {
        Json(self.schema_handler.list_databases().await)
    }

    #[tool(
        description = "Execute a SQL statement against a named target.\nThe `database` argument is required; there is no default target.\nThe statement must start with a command allowed by the server's security level; a rejected statement returns the allowed commands.\nSupports positional `?` parameters."
    )]
    async fn query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        self.query_handler
            .query(input)
            .await
            .map(Json)
            .map_err(|e: DbError| e.into())
    }

    #[tool(
        description = "Get the CREATE TABLE statement of a table on a named target.\nBoth `database` (target name) and `table` are required."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<Json<DescribeTableOutput>, McpError> {
        self.schema_handler
            .describe_table(input)
            .await
            .map(Json)
            .map_err(|e: DbError| e.into())
    }
}

#[tool_handler]
impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "multi-mysql-mcp".to_owned(),
                title: Some("Multi MySQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for running SQL against several named MySQL databases.\n\
                \n\
                ## Workflow\n\
                1. Call `list_databases` to get the configured target names\n\
                2. Pass a target name as `database` in every `query` and `describe_table` call\n\
                \n\
                ## Rules\n\
                - `database` is always required; the server never picks a target for you\n\
                - Statements must begin with an allowed command. A rejection lists the allowed commands\n\
                - Targets added to the server's configuration become usable without a restart\n\
                \n\
                ## Resources\n\
                Tables of the default target (first in `list_databases`) are listed as resources \
                named `database.table`; reading one returns its column layout."
                    .to_string(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let tables = self
            .schema_handler
            .list_table_resources()
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to list table resources"))?;

        let resources = tables
            .into_iter()
            .map(|t| RawResource::new(t.uri, t.name).no_annotation())
            .collect();
        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        let layout = self.schema_handler.read_table_resource(&request.uri).await?;
        let text = serde_json::to_string_pretty(&layout)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::text(text, request.uri)],
        })
    }
}
