//! End-to-end compilation scenarios against a small Users/Orders/Roles/
//! UserRoles catalog, exercising the full pipeline from a literal GraphQL
//! document down to the keyed SQL batch.

use async_graphql_value::{Name, Value as GqlValue};
use gql_sql_core::catalog::{
    Catalog, DefaultTypeMapper, ForeignKeyDef, IntrospectedColumn, IntrospectedTable, MetadataMap,
    NamingCase, TableColumnsRef,
};
use gql_sql_core::dialect::SqlServerDialect;
use indexmap::IndexMap;
use pretty_assertions::assert_eq;

fn column(name: &str, db_type: &str, identity: bool) -> IntrospectedColumn {
    IntrospectedColumn {
        name: name.to_string(),
        db_type: db_type.to_string(),
        nullable: false,
        is_identity: identity,
    }
}

fn fk(child: &str, child_col: &str, parent: &str, parent_col: &str) -> ForeignKeyDef {
    ForeignKeyDef {
        name: format!("fk_{child}_{child_col}"),
        child: TableColumnsRef {
            schema: "dbo".to_string(),
            table: child.to_string(),
            columns: vec![child_col.to_string()],
        },
        parent: TableColumnsRef {
            schema: "dbo".to_string(),
            table: parent.to_string(),
            columns: vec![parent_col.to_string()],
        },
    }
}

fn test_catalog() -> Catalog {
    let tables = vec![
        IntrospectedTable {
            schema: "dbo".to_string(),
            name: "Users".to_string(),
            columns: vec![
                column("Id", "int", true),
                column("Email", "nvarchar", false),
                column("Name", "nvarchar", false),
                column("TenantId", "int", false),
            ],
            primary_key: vec!["Id".to_string()],
        },
        IntrospectedTable {
            schema: "dbo".to_string(),
            name: "Orders".to_string(),
            columns: vec![
                column("Id", "int", true),
                column("UserId", "int", false),
                column("Total", "decimal", false),
            ],
            primary_key: vec!["Id".to_string()],
        },
        IntrospectedTable {
            schema: "dbo".to_string(),
            name: "Roles".to_string(),
            columns: vec![column("Id", "int", true), column("Label", "nvarchar", false)],
            primary_key: vec!["Id".to_string()],
        },
        IntrospectedTable {
            schema: "dbo".to_string(),
            name: "UserRoles".to_string(),
            columns: vec![column("UserId", "int", false), column("RoleId", "int", false)],
            primary_key: vec!["UserId".to_string(), "RoleId".to_string()],
        },
    ];

    let foreign_keys = vec![
        fk("Orders", "UserId", "Users", "Id"),
        fk("UserRoles", "UserId", "Users", "Id"),
        fk("UserRoles", "RoleId", "Roles", "Id"),
    ];

    let metadata = MetadataMap::new();
    let mapper = DefaultTypeMapper;

    Catalog::build(&tables, &foreign_keys, &metadata, &mapper, NamingCase::CamelCase)
        .expect("fixture catalog builds")
}

fn compile(document: &str) -> IndexMap<String, gql_sql_core::sql::ParameterizedSql> {
    let catalog = test_catalog();
    let dialect = SqlServerDialect;
    let variables: IndexMap<Name, GqlValue> = IndexMap::new();
    let cancellation = gql_sql_core::cancel::CancellationToken::new();
    gql_sql_core::compile_operation(&catalog, document, None, &variables, &dialect, &cancellation)
        .expect("document compiles")
}

fn v(x: impl Into<sea_query::Value>) -> sea_query::Value {
    x.into()
}

#[test]
fn s1_simple_list_with_filter_and_paging() {
    let out = compile(r#"{ users(limit: 10, filter: {name: {_eq: "Alice"}}) { id email } }"#);

    let users = out.get("users").expect("users key present");
    assert_eq!(
        users.sql,
        "SELECT [Id] [id],[Email] [email] FROM [dbo].[Users] WHERE [Users].[Name] = @p0 \
         ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
    );
    assert_eq!(users.params.len(), 1);
    assert_eq!(users.params[0].name, "@p0");
    assert_eq!(users.params[0].value, v("Alice".to_string()));

    let count = out.get("users=>count").expect("users=>count key present");
    assert_eq!(
        count.sql,
        "SELECT COUNT(*) FROM [dbo].[Users] WHERE [Users].[Name] = @p0"
    );
}

#[test]
fn s2_primary_key_lookup() {
    let out = compile(r#"{ orders(_primaryKey: [42]) { id total } }"#);

    let orders = out.get("orders").expect("orders key present");
    assert!(orders.sql.contains("WHERE [Orders].[Id] = @p0"));
    assert_eq!(orders.params.len(), 1);
    assert_eq!(orders.params[0].value, v(42i64));

    assert!(out.contains_key("orders=>count"));
}

#[test]
fn s3_one_to_many_join_with_child_filter() {
    let out = compile(r#"{ users { id orders(filter: {total: {_gt: 100}}) { id total } } }"#);

    let users = out.get("users").expect("users key present");
    assert_eq!(
        users.sql,
        "SELECT [Id] [id] FROM [dbo].[Users] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 100 ROWS ONLY"
    );

    let joined = out.get("users->orders").expect("users->orders key present");
    assert_eq!(
        joined.sql,
        "SELECT [a].[JoinId] [src_id], [b].[Id] AS [id], [b].[Total] AS [total] \
         FROM (SELECT DISTINCT [Id] AS [JoinId] FROM [Users]) [a] \
         INNER JOIN [Orders] [b] ON [a].[JoinId] = [b].[UserId] \
         WHERE [b].[Total] > @p0 \
         ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 100 ROWS ONLY"
    );
    assert_eq!(joined.params.len(), 1);
    assert_eq!(joined.params[0].value, v(100i64));
}

#[test]
fn s4_many_to_many_through_junction() {
    let out = compile(r#"{ users { id roles { id label } } }"#);

    assert!(out.contains_key("users"));
    let junction = out.get("users->userRoles").expect("users->userRoles key present");
    let roles = out.get("userRoles->roles").expect("userRoles->roles key present");

    assert!(junction.sql.contains("FROM (SELECT DISTINCT [Id] AS [JoinId] FROM [Users]) [a]"));
    assert!(junction.sql.contains("INNER JOIN [UserRoles] [b] ON [a].[JoinId] = [b].[UserId]"));
    assert!(junction.sql.contains("[b].[RoleId] AS [roleId]"));

    assert!(roles.sql.contains("INNER JOIN [Roles] [b] ON [a].[JoinId] = [b].[Id]"));
    assert!(roles.sql.contains("[b].[Id] AS [id]"));
    assert!(roles.sql.contains("[b].[Label] AS [label]"));
}

#[test]
fn s5_filter_traversal_through_single_link() {
    let out = compile(r#"{ orders(filter: {user: {tenantId: {_eq: 7}}}) { id total } }"#);

    let orders = out.get("orders").expect("orders key present");
    assert!(orders.sql.contains(
        "INNER JOIN (SELECT DISTINCT [Id] AS [joinid] FROM [Users] WHERE [Users].[TenantId] = @p0) [j0] \
         ON [j0].[joinid] = [Orders].[UserId]"
    ));
    assert_eq!(orders.params.len(), 1);
    assert_eq!(orders.params[0].value, v(7i64));
}

#[test]
fn s6_aggregate_over_one_to_many_chain() {
    let out = compile(
        r#"{ users { id totalSpent: _agg(operation: SUM, value: { orders: { column: "Total" } }) } }"#,
    );

    let agg = out.get("users=>agg_totalSpent").expect("users=>agg_totalSpent key present");
    assert_eq!(
        agg.sql,
        "SELECT src.[srcId] AS [srcId], SUM(next.[Total]) AS [totalSpent] \
         FROM (SELECT src.[srcId] AS [srcId], next.[Id] AS [joinId] \
         FROM (SELECT DISTINCT [Id] AS [srcId], [Id] AS [joinId] FROM [Users]) src \
         INNER JOIN [Orders] next ON src.[joinId] = next.[UserId]) src \
         INNER JOIN [Orders] next ON src.[joinId] = next.[Id] GROUP BY src.[srcId]"
    );
}

#[test]
fn nested_join_splices_its_own_filter_joinwalk_into_its_own_from() {
    let out = compile(
        r#"{ users { id orders(filter: {user: {tenantId: {_eq: 7}}}) { id total } } }"#,
    );

    let joined = out.get("users->orders").expect("users->orders key present");
    assert!(
        joined.sql.contains(
            "INNER JOIN (SELECT DISTINCT [Id] AS [joinid] FROM [Users] WHERE [Users].[TenantId] = @p0) [j0] \
             ON [j0].[joinid] = [b].[UserId]"
        ),
        "nested join's own emitted SQL must splice in its filter's JoinWalk join: {}",
        joined.sql
    );
}

#[test]
fn aggregate_terminal_column_accepts_bare_enum_form() {
    let out = compile(
        r#"{ users { id totalSpent: _agg(operation: SUM, value: { orders: { column: Total } }) } }"#,
    );
    let agg = out.get("users=>agg_totalSpent").expect("users=>agg_totalSpent key present");
    assert!(agg.sql.contains("SUM(next.[Total])"));
}

#[test]
fn cancellation_short_circuits_compilation() {
    let catalog = test_catalog();
    let dialect = SqlServerDialect;
    let variables: IndexMap<Name, GqlValue> = IndexMap::new();
    let cancellation = gql_sql_core::cancel::CancellationToken::new();
    cancellation.cancel();

    let err = gql_sql_core::compile_operation(
        &catalog,
        r#"{ users { id } }"#,
        None,
        &variables,
        &dialect,
        &cancellation,
    )
    .expect_err("cancelled compilation must not return partial output");
    assert!(matches!(err, gql_sql_core::error::ExecutionError::Cancelled));
}

#[test]
fn key_uniqueness_holds_for_every_scenario() {
    for doc in [
        r#"{ users(limit: 10, filter: {name: {_eq: "Alice"}}) { id email } }"#,
        r#"{ orders(_primaryKey: [42]) { id total } }"#,
        r#"{ users { id orders(filter: {total: {_gt: 100}}) { id total } } }"#,
        r#"{ users { id roles { id label } } }"#,
        r#"{ orders(filter: {user: {tenantId: {_eq: 7}}}) { id total } }"#,
        r#"{ users { id totalSpent: _agg(operation: SUM, value: { orders: { column: "Total" } }) } }"#,
    ] {
        let out = compile(doc);
        let mut seen = std::collections::HashSet::new();
        for key in out.keys() {
            assert!(seen.insert(key.clone()), "duplicate key {key} in {doc}");
        }
    }
}
