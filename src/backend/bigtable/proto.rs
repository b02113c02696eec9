//! Protobuf messages for the Bigtable RPCs the shell issues.
//!
//! Only the fields the shell reads or writes are declared. Field tags follow
//! `google/bigtable/v2/{bigtable,data}.proto` and
//! `google/bigtable/admin/v2/{bigtable_table_admin,bigtable_instance_admin,table,instance}.proto`;
//! prost skips undeclared fields when decoding.

use std::collections::HashMap;

pub const READ_ROWS: &str = "/google.bigtable.v2.Bigtable/ReadRows";
pub const MUTATE_ROW: &str = "/google.bigtable.v2.Bigtable/MutateRow";
pub const CREATE_TABLE: &str = "/google.bigtable.admin.v2.BigtableTableAdmin/CreateTable";
pub const MODIFY_COLUMN_FAMILIES: &str =
    "/google.bigtable.admin.v2.BigtableTableAdmin/ModifyColumnFamilies";
pub const DELETE_TABLE: &str = "/google.bigtable.admin.v2.BigtableTableAdmin/DeleteTable";
pub const LIST_TABLES: &str = "/google.bigtable.admin.v2.BigtableTableAdmin/ListTables";
pub const GET_INSTANCE: &str = "/google.bigtable.admin.v2.BigtableInstanceAdmin/GetInstance";
pub const CREATE_INSTANCE: &str = "/google.bigtable.admin.v2.BigtableInstanceAdmin/CreateInstance";
pub const LIST_CLUSTERS: &str = "/google.bigtable.admin.v2.BigtableInstanceAdmin/ListClusters";

#[derive(Clone, PartialEq, prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StringValue {
    #[prost(string, tag = "1")]
    pub value: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BytesValue {
    #[prost(bytes = "vec", tag = "1")]
    pub value: Vec<u8>,
}

// ---------------------------------------------------------------------------
// data plane
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct RowSet {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub row_keys: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadRowsRequest {
    #[prost(string, tag = "1")]
    pub table_name: String,
    #[prost(message, optional, tag = "2")]
    pub rows: Option<RowSet>,
    #[prost(int64, tag = "4")]
    pub rows_limit: i64,
    #[prost(string, tag = "5")]
    pub app_profile_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadRowsResponse {
    #[prost(message, repeated, tag = "1")]
    pub chunks: Vec<CellChunk>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CellChunk {
    #[prost(bytes = "vec", tag = "1")]
    pub row_key: Vec<u8>,
    #[prost(message, optional, tag = "2")]
    pub family_name: Option<StringValue>,
    #[prost(message, optional, tag = "3")]
    pub qualifier: Option<BytesValue>,
    #[prost(int64, tag = "4")]
    pub timestamp_micros: i64,
    #[prost(bytes = "vec", tag = "6")]
    pub value: Vec<u8>,
    #[prost(int32, tag = "7")]
    pub value_size: i32,
    #[prost(oneof = "RowStatus", tags = "8, 9")]
    pub row_status: Option<RowStatus>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum RowStatus {
    #[prost(bool, tag = "8")]
    ResetRow(bool),
    #[prost(bool, tag = "9")]
    CommitRow(bool),
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SetCell {
    #[prost(string, tag = "1")]
    pub family_name: String,
    #[prost(bytes = "vec", tag = "2")]
    pub column_qualifier: Vec<u8>,
    #[prost(int64, tag = "3")]
    pub timestamp_micros: i64,
    #[prost(bytes = "vec", tag = "4")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Mutation {
    #[prost(oneof = "MutationKind", tags = "1")]
    pub mutation: Option<MutationKind>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum MutationKind {
    #[prost(message, tag = "1")]
    SetCell(SetCell),
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct MutateRowRequest {
    #[prost(string, tag = "1")]
    pub table_name: String,
    #[prost(bytes = "vec", tag = "2")]
    pub row_key: Vec<u8>,
    #[prost(message, repeated, tag = "3")]
    pub mutations: Vec<Mutation>,
    #[prost(string, tag = "4")]
    pub app_profile_id: String,
}

// ---------------------------------------------------------------------------
// table admin
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct ColumnFamily {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Table {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(map = "string, message", tag = "3")]
    pub column_families: HashMap<String, ColumnFamily>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateTableRequest {
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(string, tag = "2")]
    pub table_id: String,
    #[prost(message, optional, tag = "3")]
    pub table: Option<Table>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Modification {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(oneof = "ModificationKind", tags = "2")]
    pub kind: Option<ModificationKind>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum ModificationKind {
    #[prost(message, tag = "2")]
    Create(ColumnFamily),
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ModifyColumnFamiliesRequest {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub modifications: Vec<Modification>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteTableRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListTablesRequest {
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(string, tag = "3")]
    pub page_token: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListTablesResponse {
    #[prost(message, repeated, tag = "1")]
    pub tables: Vec<Table>,
    #[prost(string, tag = "2")]
    pub next_page_token: String,
}

// ---------------------------------------------------------------------------
// instance admin
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct Instance {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub display_name: String,
    /// `Instance.State`: 0 unknown, 1 ready, 2 creating.
    #[prost(int32, tag = "3")]
    pub state: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Cluster {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub location: String,
    #[prost(int32, tag = "4")]
    pub serve_nodes: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetInstanceRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateInstanceRequest {
    #[prost(string, tag = "1")]
    pub parent: String,
    #[prost(string, tag = "2")]
    pub instance_id: String,
    #[prost(message, optional, tag = "3")]
    pub instance: Option<Instance>,
    #[prost(map = "string, message", tag = "4")]
    pub clusters: HashMap<String, Cluster>,
}

/// `google.longrunning.Operation`, reduced to what is logged.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Operation {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bool, tag = "3")]
    pub done: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListClustersRequest {
    #[prost(string, tag = "1")]
    pub parent: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListClustersResponse {
    #[prost(message, repeated, tag = "1")]
    pub clusters: Vec<Cluster>,
}

pub fn instance_state_name(state: i32) -> &'static str {
    match state {
        1 => "READY",
        2 => "CREATING",
        _ => "STATE_NOT_KNOWN",
    }
}
