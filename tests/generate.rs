use std::fs;

use symgen::codegen::error::is_kind;
use symgen::lang;
use symgen::{generate, Backend, EqnStyle, GenerationError, Model, ModelBuilder, Options, Overrides, SumStyle};

fn small() -> Model {
    ModelBuilder::new()
        .set("r", &["r1", "r2"], &[])
        .parameter("A", &["r"], &[])
        .variable("Y", &["r"], &["end", "gdp"], "output")
        .variable("B", &["r"], &["exo", "gdp"], "")
        .equation_text("Y(r) = A(r) + B(r)", &["r"])
        .build()
        .unwrap()
}

#[test]
fn scalar_generation_emits_one_statement_per_element() {
    let _ = env_logger::builder().is_test(true).try_init();
    let overrides = Overrides {
        eqn_style: Some(EqnStyle::Scalar),
        sum_style: Some(SumStyle::Scalar),
        ..Default::default()
    };
    let out = generate(&small(), "generic", overrides, "small").unwrap();
    assert_eq!(out.code, "Y(r1) = A(r1) + B(r1) ;\n\nY(r2) = A(r2) + B(r2) ;\n\n");
    assert_eq!(out.stats.statements, 2);
}

#[test]
fn every_dialect_handles_the_same_model() {
    let model = small();
    let python = generate(&model, "python", Overrides::default(), "small").unwrap();
    assert!(python.code.contains("    z1l[0] = par[0] + exo[0]\n\n    z1l[1] = par[1] + exo[1]\n\n"));

    // `r` is itself a declared name, so its index letter becomes `r1`
    let tablo = generate(&model, "tablo", Overrides::default(), "small").unwrap();
    assert!(tablo.code.contains("\n   Y(r1) = A(r1) + B(r1) ;\n"));

    let html = generate(&model, "html", Overrides::default(), "small").unwrap();
    assert!(html.code.contains("\\href{#Y}{Y(r1)} = \\href{#A}{A(r1)} + \\href{#B}{B(r1)}"));
}

#[test]
fn generic_dialect_needs_styles() {
    let err = generate(&small(), "generic", Overrides::default(), "small").unwrap_err();
    assert!(is_kind(&err, &GenerationError::Configuration(String::new())));
}

#[test]
fn failed_passes_write_nothing() {
    let dir = std::env::temp_dir().join("symgen_failed_pass");
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    let basename = dir.join("unsquare");
    let basename = basename.to_str().unwrap();

    let model = ModelBuilder::new()
        .set("r", &["r1", "r2"], &[])
        .variable("Y", &["r"], &["end", "gdp"], "")
        .variable("Z", &["r"], &["end", "gdp"], "")
        .equation_text("Y(r) = Z(r)", &["r"])
        .build()
        .unwrap();
    let mut backend = lang::select("python", Options::default()).unwrap();
    let options = backend.options();
    let result = backend.write_file(&model, options, basename);
    assert!(is_kind(&result.err().unwrap(), &GenerationError::CountMismatch(String::new())));
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
}

#[test]
fn saves_every_stream() {
    let dir = std::env::temp_dir().join("symgen_saved_pass");
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    let basename = dir.join("small");
    let basename = basename.to_str().unwrap();

    let out = generate(&small(), "python", Overrides::default(), basename).unwrap();
    out.save(basename).unwrap();
    for suffix in [".py", ".info", "_varinfo.csv", "_vars.csv", "_varmap.csv", "_optmap.csv"] {
        let path = format!("{}{}", basename, suffix);
        assert!(fs::metadata(&path).is_ok(), "{} missing", path);
    }
    let code = fs::read_to_string(format!("{}.py", basename)).unwrap();
    assert!(code.starts_with("import numpy as np\n"));
}

#[test]
fn json_models_generate() {
    let text = r#"{
        "sets": [
            { "name": "time", "elements": ["2020", "2021", "2022"] },
            { "name": "reg", "elements": ["usa", "row"] }
        ],
        "parameters": [{ "name": "delta", "attributes": ["P001"] }],
        "variables": [
            { "name": "K", "domain": ["reg", "time"], "attributes": ["N001"] },
            { "name": "I", "domain": ["reg", "time"], "attributes": ["X001"] }
        ],
        "equations": [
            { "equation": "K(reg,time) = (1 - delta)*lag(K(reg,time)) + I(reg,time)",
              "sets": ["reg", "time"], "label": "capital" }
        ]
    }"#;
    let model = Model::from_json_str(text).unwrap();
    let out = generate(&model, "tablo", Overrides::default(), "capital").unwrap();
    assert!(out.code.contains(
        "\nequation capital (all,r,reg) (all,t,time) \n   K(r,t) = (1 - delta)*K(r,t-1) + I(r,t) ;\n"
    ));
    assert!(out.info.contains("Equations and variables match"));
}
