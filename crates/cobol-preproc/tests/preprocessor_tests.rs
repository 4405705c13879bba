//! End-to-end scenarios for the preprocessing driver.

use cobol_preproc::{
    DiagnosticKind, MemoryLookup, OptionValue, PreprocessError, PreprocessedUnit, Preprocessor,
    Severity, SourceFormat, Token,
};

fn run(lookup: &MemoryLookup, source: &str) -> Result<PreprocessedUnit, PreprocessError> {
    Preprocessor::new(lookup)
        .with_format(SourceFormat::Free)
        .preprocess(source)
}

fn texts(tokens: &[Token]) -> Vec<String> {
    tokens
        .iter()
        .filter(|t| !t.kind.is_newline())
        .map(|t| t.kind.to_string())
        .collect()
}

#[test]
fn test_simple_copy_expansion() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("GREET", None, "DISPLAY 'HI'.");
    let unit = run(&lookup, "COPY GREET.").unwrap();
    assert_eq!(texts(&unit.tokens), ["DISPLAY", "'HI'", "."]);
    assert!(unit.diagnostics.is_empty());
}

#[test]
fn test_nested_copy_expansion() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("OUTER", None, "MOVE A TO B.\nCOPY INNER.");
    lookup.insert("INNER", None, "MOVE C TO D.");
    let unit = run(&lookup, "COPY OUTER.").unwrap();
    assert_eq!(
        texts(&unit.tokens),
        ["MOVE", "A", "TO", "B", ".", "MOVE", "C", "TO", "D", "."]
    );
}

#[test]
fn test_copy_replacing_rewrites_copybook_text() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("REC", None, "01 NAME.");
    let unit = run(&lookup, "COPY REC REPLACING ==NAME== BY ==CUST-ID==.").unwrap();
    assert_eq!(texts(&unit.tokens), ["01", "CUST-ID", "."]);
}

#[test]
fn test_replacing_is_one_shot() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("REC", None, "01 NAME.");
    let unit = run(
        &lookup,
        "COPY REC REPLACING ==NAME== BY ==CUST-ID==.\n01 NAME.",
    )
    .unwrap();
    assert_eq!(
        texts(&unit.tokens),
        ["01", "CUST-ID", ".", "01", "NAME", "."]
    );
}

#[test]
fn test_replace_region_rewrites_main_text() {
    let lookup = MemoryLookup::new();
    let unit = run(
        &lookup,
        "REPLACE ==OLD== BY ==NEW==.\nMOVE OLD TO X.\nREPLACE OFF.\nMOVE OLD TO Y.",
    )
    .unwrap();
    assert_eq!(
        texts(&unit.tokens),
        ["MOVE", "NEW", "TO", "X", ".", "MOVE", "OLD", "TO", "Y", "."]
    );
    assert!(unit.diagnostics.is_empty());
}

#[test]
fn test_replace_before_copy_rewrites_copied_text() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("REC", None, "01 NAME.");
    let unit = run(
        &lookup,
        "REPLACE ==NAME== BY ==CUST-ID==.\nCOPY REC.\nREPLACE OFF.",
    )
    .unwrap();
    assert_eq!(texts(&unit.tokens), ["01", "CUST-ID", "."]);
}

#[test]
fn test_region_opened_in_copybook_survives_return() {
    // REPLACE scopes dynamically: a region opened inside a copybook keeps
    // applying after the COPY returns, until its own REPLACE OFF.
    let mut lookup = MemoryLookup::new();
    lookup.insert("SETUP", None, "REPLACE ==A== BY ==B==.");
    let unit = run(&lookup, "COPY SETUP.\nMOVE A TO X.\nREPLACE OFF.\nMOVE A TO Y.").unwrap();
    assert_eq!(
        texts(&unit.tokens),
        ["MOVE", "B", "TO", "X", ".", "MOVE", "A", "TO", "Y", "."]
    );
}

#[test]
fn test_outer_region_applies_before_region_opened_in_copybook() {
    // A region opened inside a copybook nests under the regions already
    // active around the COPY, so the older region still transforms the
    // copied text first.
    let mut lookup = MemoryLookup::new();
    lookup.insert("X", None, "REPLACE ==A== BY ==X2==.\nA");
    let unit = run(
        &lookup,
        "REPLACE ==A== BY ==B==.\nCOPY X.\nREPLACE OFF.\nREPLACE OFF.",
    )
    .unwrap();
    assert_eq!(texts(&unit.tokens), ["B"]);
    assert!(unit.diagnostics.is_empty());
}

#[test]
fn test_noop_region_is_identity() {
    let lookup = MemoryLookup::new();
    let source = "REPLACE ==ZZZ== BY ==QQQ==.\nMOVE A TO B.\nREPLACE OFF.";
    let unit = run(&lookup, source).unwrap();
    assert_eq!(texts(&unit.tokens), ["MOVE", "A", "TO", "B", "."]);
    assert!(unit.diagnostics.is_empty());
}

#[test]
fn test_first_listed_rule_wins_at_each_position() {
    let lookup = MemoryLookup::new();
    let unit = run(
        &lookup,
        "REPLACE ==A B== BY ==X== ==A== BY ==Y==.\nA B C\nREPLACE OFF.",
    )
    .unwrap();
    assert_eq!(texts(&unit.tokens), ["X", "C"]);
}

#[test]
fn test_replacement_output_is_not_rescanned() {
    let lookup = MemoryLookup::new();
    let unit = run(&lookup, "REPLACE ==A== BY ==A A==.\nA\nREPLACE OFF.").unwrap();
    assert_eq!(texts(&unit.tokens), ["A", "A"]);
}

#[test]
fn test_qualified_rule_applies_only_to_matching_library() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("REC", Some("PAYLIB"), "01 AMT.");
    lookup.insert("REC2", None, "01 AMT.");
    let unit = run(
        &lookup,
        "REPLACE ==AMT== BY ==TOTAL== OF PAYLIB.\nCOPY REC OF PAYLIB.\nCOPY REC2.\n01 AMT.\nREPLACE OFF.",
    )
    .unwrap();
    assert_eq!(
        texts(&unit.tokens),
        ["01", "TOTAL", ".", "01", "AMT", ".", "01", "AMT", "."]
    );
}

#[test]
fn test_cyclic_copy_pair_is_fatal() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("A", None, "COPY B.");
    lookup.insert("B", None, "COPY A.");
    let err = run(&lookup, "COPY A.").unwrap_err();
    assert!(matches!(err, PreprocessError::CyclicCopy { ref name, .. } if name == "A"));
}

#[test]
fn test_self_copy_is_fatal() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("SELF", None, "COPY SELF.");
    let err = run(&lookup, "COPY SELF.").unwrap_err();
    assert!(matches!(err, PreprocessError::CyclicCopy { ref name, .. } if name == "SELF"));
}

#[test]
fn test_copybook_not_found_is_fatal() {
    let lookup = MemoryLookup::new();
    let err = run(&lookup, "COPY MISSING.").unwrap_err();
    assert!(matches!(
        err,
        PreprocessError::CopybookNotFound { ref name, .. } if name == "MISSING"
    ));
}

#[test]
fn test_unmatched_replace_off_warns_and_continues() {
    let lookup = MemoryLookup::new();
    let unit = run(&lookup, "REPLACE OFF.\nMOVE A TO B.").unwrap();
    assert_eq!(texts(&unit.tokens), ["MOVE", "A", "TO", "B", "."]);
    assert_eq!(unit.diagnostics.len(), 1);
    assert_eq!(unit.diagnostics[0].kind, DiagnosticKind::UnmatchedReplaceOff);
    assert_eq!(unit.diagnostics[0].severity, Severity::Warning);
}

#[test]
fn test_dangling_region_warns_at_end_of_unit() {
    let lookup = MemoryLookup::new();
    let unit = run(&lookup, "REPLACE ==A== BY ==B==.\nA").unwrap();
    assert_eq!(texts(&unit.tokens), ["B"]);
    assert_eq!(unit.diagnostics.len(), 1);
    assert_eq!(unit.diagnostics[0].kind, DiagnosticKind::DanglingReplaceScope);
}

#[test]
fn test_suppressed_copy_emits_nothing_but_still_resolves() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("REC", None, "01 NAME.");
    let unit = run(&lookup, "COPY REC SUPPRESS.\nMOVE A TO B.").unwrap();
    assert_eq!(texts(&unit.tokens), ["MOVE", "A", "TO", "B", "."]);
    assert_eq!(unit.diagnostics.len(), 1);
    assert_eq!(unit.diagnostics[0].kind, DiagnosticKind::SuppressedCopy);
    assert_eq!(unit.diagnostics[0].severity, Severity::Info);
}

#[test]
fn test_suppressed_copy_still_detects_missing_copybook() {
    let lookup = MemoryLookup::new();
    let err = run(&lookup, "COPY MISSING SUPPRESS.").unwrap_err();
    assert!(matches!(err, PreprocessError::CopybookNotFound { .. }));
}

#[test]
fn test_exec_cics_interior_is_opaque() {
    // A COPY inside an EXEC CICS block is CICS text, not a directive; the
    // unknown copybook name must not produce an error.
    let lookup = MemoryLookup::new();
    let unit = run(&lookup, "EXEC CICS SEND COPY NOSUCH END-EXEC.").unwrap();
    assert_eq!(
        texts(&unit.tokens),
        ["EXEC", "CICS", "SEND", "COPY", "NOSUCH", "END-EXEC", "."]
    );
}

#[test]
fn test_exec_sqlims_interior_is_opaque() {
    let lookup = MemoryLookup::new();
    let unit = run(&lookup, "EXEC SQLIMS REPLACE ROWS END-EXEC.").unwrap();
    assert_eq!(
        texts(&unit.tokens),
        ["EXEC", "SQLIMS", "REPLACE", "ROWS", "END-EXEC", "."]
    );
}

#[test]
fn test_exec_sql_interior_honors_copy() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("SQLCA", None, "01 SQLCODE PIC S9(9).");
    let unit = run(&lookup, "EXEC SQL COPY SQLCA. END-EXEC.").unwrap();
    assert_eq!(
        texts(&unit.tokens),
        [
            "EXEC", "SQL", "01", "SQLCODE", "PIC", "S9", "(", "9", ")", ".", "END-EXEC", "."
        ]
    );
}

#[test]
fn test_active_region_rewrites_exec_passthrough() {
    let lookup = MemoryLookup::new();
    let unit = run(
        &lookup,
        "REPLACE ==ACCT== BY ==ACCT-ID==.\nEXEC CICS READ ACCT END-EXEC.\nREPLACE OFF.",
    )
    .unwrap();
    assert_eq!(
        texts(&unit.tokens),
        ["EXEC", "CICS", "READ", "ACCT-ID", "END-EXEC", "."]
    );
}

#[test]
fn test_unterminated_exec_is_fatal() {
    let lookup = MemoryLookup::new();
    let err = run(&lookup, "EXEC CICS SEND MAP").unwrap_err();
    assert!(matches!(err, PreprocessError::UnterminatedExec { .. }));
}

#[test]
fn test_cbl_options_are_collected() {
    let lookup = MemoryLookup::new();
    let unit = run(&lookup, "CBL ARITH(EXTEND),RENT\nMOVE A TO B.").unwrap();
    assert_eq!(
        unit.options.get("ARITH"),
        Some(&OptionValue::Value("EXTEND".into()))
    );
    assert_eq!(unit.options.get("RENT"), Some(&OptionValue::Flag));
    assert_eq!(texts(&unit.tokens), ["MOVE", "A", "TO", "B", "."]);
}

#[test]
fn test_process_statements_merge() {
    let lookup = MemoryLookup::new();
    let unit = run(&lookup, "CBL TRUNC(STD)\nPROCESS TRUNC(BIN),MARGINS(1,72)").unwrap();
    assert_eq!(
        unit.options.get("TRUNC"),
        Some(&OptionValue::Value("BIN".into()))
    );
    assert_eq!(
        unit.options.get("MARGINS"),
        Some(&OptionValue::List(vec!["1".into(), "72".into()]))
    );
}

#[test]
fn test_xopts_group() {
    let lookup = MemoryLookup::new();
    let unit = run(&lookup, "CBL XOPTS(COBOL2 NOEDF)").unwrap();
    assert!(unit.options.is_set("XOPTS"));
    assert!(unit.options.is_set("COBOL2"));
    assert!(unit.options.is_set("NOEDF"));
}

#[test]
fn test_unknown_compiler_option_is_fatal() {
    let lookup = MemoryLookup::new();
    let err = run(&lookup, "CBL NOTANOPTION").unwrap_err();
    assert!(matches!(
        err,
        PreprocessError::UnknownDirective { ref option, .. } if option == "NOTANOPTION"
    ));
}

#[test]
fn test_fixed_format_copy_with_continuation() {
    let mut lookup = MemoryLookup::new();
    lookup.insert("REC", None, "000100 01 NAME.");
    let source = "000100 COPY REC REPLACING\n000200-    ==NAME== BY ==CUST-ID==.";
    let unit = Preprocessor::new(&lookup).preprocess(source).unwrap();
    assert_eq!(texts(&unit.tokens), ["01", "CUST-ID", "."]);
}

#[test]
fn test_balanced_regions_leave_no_diagnostics() {
    let lookup = MemoryLookup::new();
    let unit = run(
        &lookup,
        "REPLACE ==A== BY ==B==.\nREPLACE ==C== BY ==D==.\nA C\nREPLACE OFF.\nREPLACE OFF.\nA C",
    )
    .unwrap();
    // The second statement nests inside the first; both rules are active
    // until their matching OFFs.
    assert_eq!(texts(&unit.tokens), ["B", "D", "A", "C"]);
    assert!(unit.diagnostics.is_empty());
}
