//! Database schema definitions

/// Files and their parse status
pub const CREATE_FILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    path TEXT NOT NULL UNIQUE,
    parse_status TEXT NOT NULL
)
"#;

pub const CREATE_BUILD_ACTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS build_actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    command TEXT NOT NULL
)
"#;

pub const CREATE_BUILD_SOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS build_sources (
    file_id INTEGER NOT NULL,
    action_id INTEGER NOT NULL,
    PRIMARY KEY (file_id, action_id)
)
"#;

/// One row per located occurrence (declaration or usage)
pub const CREATE_AST_NODES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ast_nodes (
    id INTEGER PRIMARY KEY,
    qualified_name TEXT NOT NULL,
    symbol_type TEXT NOT NULL,
    ast_type TEXT NOT NULL,
    file_id INTEGER NOT NULL,
    start_line INTEGER NOT NULL,
    start_column INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL
)
"#;

pub const CREATE_VARIABLES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS variables (
    id INTEGER PRIMARY KEY,
    ast_node_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    visibility TEXT NOT NULL
)
"#;

pub const CREATE_FUNCTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS functions (
    id INTEGER PRIMARY KEY,
    ast_node_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    visibility TEXT NOT NULL
)
"#;

/// Ordered parameter and local variable lists of functions
pub const CREATE_FUNCTION_VARIABLES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS function_variables (
    function_id INTEGER NOT NULL,
    role TEXT NOT NULL,
    position INTEGER NOT NULL,
    variable_id INTEGER NOT NULL,
    PRIMARY KEY (function_id, role, position)
)
"#;

pub const CREATE_CLASSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS classes (
    id INTEGER PRIMARY KEY,
    ast_node_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    qualified_name TEXT NOT NULL,
    visibility TEXT NOT NULL
)
"#;

pub const CREATE_CLASS_MEMBERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS class_members (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    class_id INTEGER NOT NULL,
    member_id INTEGER NOT NULL,
    ast_node_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    static_member INTEGER NOT NULL,
    UNIQUE(class_id, member_id, kind, static_member)
)
"#;

pub const CREATE_INHERITANCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS inheritance (
    derived INTEGER NOT NULL,
    base INTEGER NOT NULL,
    PRIMARY KEY (derived, base)
)
"#;

pub const CREATE_IMPORTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ast_node_id INTEGER NOT NULL,
    importer INTEGER NOT NULL,
    imported INTEGER NOT NULL,
    imported_symbol INTEGER
)
"#;

pub const CREATE_DOCUMENTATION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS documentation (
    documented INTEGER NOT NULL,
    kind TEXT NOT NULL,
    text TEXT NOT NULL,
    PRIMARY KEY (documented, kind)
)
"#;

pub const CREATE_TYPES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS types (
    symbol INTEGER NOT NULL,
    type_id INTEGER NOT NULL,
    PRIMARY KEY (symbol, type_id)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_ast_nodes_qualified_name ON ast_nodes(qualified_name)",
    "CREATE INDEX IF NOT EXISTS idx_ast_nodes_file ON ast_nodes(file_id)",
    "CREATE INDEX IF NOT EXISTS idx_variables_qualified_name ON variables(qualified_name)",
    "CREATE INDEX IF NOT EXISTS idx_functions_qualified_name ON functions(qualified_name)",
    "CREATE INDEX IF NOT EXISTS idx_classes_qualified_name ON classes(qualified_name)",
    "CREATE INDEX IF NOT EXISTS idx_class_members_class ON class_members(class_id)",
    "CREATE INDEX IF NOT EXISTS idx_inheritance_base ON inheritance(base)",
    "CREATE INDEX IF NOT EXISTS idx_imports_importer ON imports(importer)",
];

/// Tables in write order, used for row counts
pub const TABLES: &[&str] = &[
    "files",
    "build_actions",
    "build_sources",
    "ast_nodes",
    "variables",
    "functions",
    "function_variables",
    "classes",
    "class_members",
    "inheritance",
    "imports",
    "documentation",
    "types",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_FILES_TABLE,
        CREATE_BUILD_ACTIONS_TABLE,
        CREATE_BUILD_SOURCES_TABLE,
        CREATE_AST_NODES_TABLE,
        CREATE_VARIABLES_TABLE,
        CREATE_FUNCTIONS_TABLE,
        CREATE_FUNCTION_VARIABLES_TABLE,
        CREATE_CLASSES_TABLE,
        CREATE_CLASS_MEMBERS_TABLE,
        CREATE_INHERITANCE_TABLE,
        CREATE_IMPORTS_TABLE,
        CREATE_DOCUMENTATION_TABLE,
        CREATE_TYPES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
