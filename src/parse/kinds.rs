//! Kind labels for persisted AST nodes
//!
//! The `nodes.kind` column carries Go AST type names (`*ast.FuncDecl`,
//! `*ast.Ident`, ...). The bundled exploration queries and governance
//! rules match on these strings literally, so the label set is a
//! versioned schema contract. This module translates tree-sitter-go
//! grammar kinds into that label family; grammar kinds with no
//! counterpart (argument lists, clause wrappers, punctuation) produce
//! no row and their children attach to the nearest labeled ancestor.

use tree_sitter::Node;

/// Map a tree-sitter node to its persisted kind label, or None when the
/// node should not become a row.
pub fn kind_label(node: &Node) -> Option<&'static str> {
    if !node.is_named() || node.is_error() || node.is_missing() {
        return None;
    }
    let label = match node.kind() {
        "source_file" => "*ast.File",

        "identifier" | "type_identifier" | "field_identifier" | "package_identifier"
        | "blank_identifier" | "label_name" | "true" | "false" | "nil" | "iota" => "*ast.Ident",

        "interpreted_string_literal" | "raw_string_literal" | "int_literal" | "float_literal"
        | "imaginary_literal" | "rune_literal" => "*ast.BasicLit",

        "import_declaration" | "const_declaration" | "var_declaration" | "type_declaration" => {
            "*ast.GenDecl"
        }
        "import_spec" => "*ast.ImportSpec",
        "const_spec" | "var_spec" => "*ast.ValueSpec",
        "type_spec" | "type_alias" => "*ast.TypeSpec",

        "function_declaration" | "method_declaration" => "*ast.FuncDecl",
        "func_literal" => "*ast.FuncLit",
        "function_type" => "*ast.FuncType",
        "parameter_list" | "field_declaration_list" | "type_parameter_list" => "*ast.FieldList",
        "parameter_declaration" | "variadic_parameter_declaration" | "field_declaration"
        | "method_elem" | "method_spec" | "type_parameter_declaration" => "*ast.Field",

        "struct_type" => "*ast.StructType",
        "interface_type" => "*ast.InterfaceType",
        "map_type" => "*ast.MapType",
        "channel_type" => "*ast.ChanType",
        "pointer_type" => "*ast.StarExpr",
        "array_type" | "implicit_length_array_type" | "slice_type" => "*ast.ArrayType",
        "qualified_type" => "*ast.SelectorExpr",
        "generic_type" => "*ast.IndexExpr",

        "block" => "*ast.BlockStmt",
        "short_var_declaration" | "assignment_statement" => "*ast.AssignStmt",
        "expression_statement" => "*ast.ExprStmt",
        "send_statement" => "*ast.SendStmt",
        "inc_statement" | "dec_statement" => "*ast.IncDecStmt",
        "labeled_statement" => "*ast.LabeledStmt",
        "empty_statement" => "*ast.EmptyStmt",
        "return_statement" => "*ast.ReturnStmt",
        "if_statement" => "*ast.IfStmt",
        "for_statement" => {
            if has_named_child(node, "range_clause") {
                "*ast.RangeStmt"
            } else {
                "*ast.ForStmt"
            }
        }
        "expression_switch_statement" => "*ast.SwitchStmt",
        "type_switch_statement" => "*ast.TypeSwitchStmt",
        "expression_case" | "type_case" => "*ast.CaseClause",
        // A bare `default:` belongs to whichever construct encloses it.
        "default_case" => {
            if node.parent().map_or(false, |p| p.kind() == "select_statement") {
                "*ast.CommClause"
            } else {
                "*ast.CaseClause"
            }
        }
        "select_statement" => "*ast.SelectStmt",
        "communication_case" => "*ast.CommClause",
        "go_statement" => "*ast.GoStmt",
        "defer_statement" => "*ast.DeferStmt",
        "break_statement" | "continue_statement" | "goto_statement"
        | "fallthrough_statement" => "*ast.BranchStmt",

        "call_expression" | "type_conversion_expression" => "*ast.CallExpr",
        "selector_expression" => "*ast.SelectorExpr",
        "index_expression" => "*ast.IndexExpr",
        "slice_expression" => "*ast.SliceExpr",
        "type_assertion_expression" => "*ast.TypeAssertExpr",
        "unary_expression" => "*ast.UnaryExpr",
        "binary_expression" => "*ast.BinaryExpr",
        "parenthesized_expression" => "*ast.ParenExpr",
        "composite_literal" => "*ast.CompositeLit",
        "keyed_element" => "*ast.KeyValueExpr",

        "comment" => "*ast.Comment",

        _ => return None,
    };
    Some(label)
}

fn has_named_child(node: &Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let result = node.named_children(&mut cursor).any(|c| c.kind() == kind);
    result
}
