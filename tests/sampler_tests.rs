//! Sampling session integration tests

use std::fs::File;
use std::io::Write;

use docschema_sdk::{
    ErrorPolicy, InferenceConfig, SampleError, Schema, SchemaSampler, SourceError, TypeTag,
    from_reader, from_values,
};
use serde_json::json;
use tempfile::TempDir;

mod file_tests {
    use super::*;

    #[test]
    fn test_ndjson_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, r#"{{"name": "Alice", "age": 30}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"name": "Bob", "_id": {{"$oid": "507f1f77bcf86cd799439011"}}}}"#)
            .unwrap();

        let mut source = from_reader(File::open(&path).unwrap()).unwrap();
        let mut sampler = SchemaSampler::new(Schema::new().with_namespace("db.users"));
        sampler.consume(&mut source).unwrap();

        let (schema, report) = sampler.finish();
        assert_eq!(report.documents_processed, 2);
        assert_eq!(schema.count(), 2);
        assert_eq!(schema.field("age").unwrap().probability(), 0.5);
        assert_eq!(
            schema.field("_id").unwrap().types()[0].tag(),
            TypeTag::ObjectId
        );
    }

    #[test]
    fn test_json_array_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, r#"[{"a": [1, 2]}, {"a": [3]}, {"a": "x"}]"#).unwrap();

        let mut source = from_reader(File::open(&path).unwrap()).unwrap();
        let mut sampler = SchemaSampler::new(Schema::new());
        sampler.consume(&mut source).unwrap();

        let a = sampler.schema().field("a").unwrap();
        let array = a.get_type(TypeTag::Array).and_then(|t| t.as_array()).unwrap();
        assert_eq!(array.lengths(), &[2, 1]);
        assert_eq!(a.get_type(TypeTag::String).unwrap().count(), 1);
    }

    #[test]
    fn test_single_object_file() {
        // A lone object is read as one NDJSON line
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("one.json");
        std::fs::write(&path, r#"{"a": 1}"#).unwrap();

        let mut source = from_reader(File::open(&path).unwrap()).unwrap();
        let mut sampler = SchemaSampler::new(Schema::new());
        sampler.consume(&mut source).unwrap();
        assert_eq!(sampler.report().documents_processed, 1);
    }

    #[test]
    fn test_pretty_printed_object_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pretty.json");
        let doc = json!({"name": "Ada", "address": {"city": "London"}, "tags": ["x", "y"]});
        std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        let mut source = from_reader(File::open(&path).unwrap()).unwrap();
        let mut sampler = SchemaSampler::new(Schema::new());
        sampler.consume(&mut source).unwrap();

        let (schema, report) = sampler.finish();
        assert_eq!(report.documents_processed, 1);
        assert_eq!(schema.count(), 1);
        let names: Vec<_> = schema.fields().names().collect();
        assert_eq!(names, vec!["name", "address", "tags"]);
        assert_eq!(
            schema.field("address").unwrap().types()[0].tag(),
            TypeTag::Document
        );
    }
}

mod policy_tests {
    use super::*;

    fn mixed_input() -> &'static str {
        concat!(
            "{\"a\": 1}\n",
            "not json\n",
            "[1, 2]\n",
            "{\"a\": {\"$date\": \"yesterday\"}}\n",
            "{\"a\": 2}\n",
        )
    }

    #[test]
    fn test_abort_stops_at_first_rejection() {
        let mut source = from_reader(mixed_input().as_bytes()).unwrap();
        let mut sampler = SchemaSampler::new(Schema::new());
        let result = sampler.consume(&mut source);

        assert!(matches!(
            result,
            Err(SampleError::Source(SourceError::Json { record: 2, .. }))
        ));
        assert_eq!(sampler.schema().count(), 1);
        assert_eq!(sampler.report().documents_skipped, 0);
    }

    #[test]
    fn test_skip_carries_on() {
        let mut source = from_reader(mixed_input().as_bytes()).unwrap();
        let mut sampler = SchemaSampler::new(Schema::new()).with_policy(ErrorPolicy::Skip);
        sampler.consume(&mut source).unwrap();

        let report = sampler.report();
        assert_eq!(report.documents_processed, 2);
        assert_eq!(report.documents_skipped, 3);
        assert_eq!(report.errors.len(), 3);

        // Rejected documents left no trace
        let a = sampler.schema().field("a").unwrap();
        assert_eq!(a.count(), 2);
        assert_eq!(a.type_names(), vec!["Number"]);
    }

    #[test]
    fn test_inference_error_carries_index() {
        let docs = vec![json!({"a": 1}), json!({"a": 2}), json!("scalar")];
        let mut sampler = SchemaSampler::new(Schema::new());
        match sampler.consume(&mut from_values(docs)) {
            Err(SampleError::Inference { index, .. }) => assert_eq!(index, 2),
            other => panic!("Expected inference error, got {other:?}"),
        }
        assert_eq!(sampler.report().documents_processed, 2);
    }
}

mod acknowledgement_tests {
    use super::*;

    #[test]
    fn test_ack_after_each_commit() {
        let docs = vec![json!({"a": 1}), json!(null), json!({"b": 1}), json!({"a": 3})];
        let mut sampler = SchemaSampler::new(Schema::new()).with_policy(ErrorPolicy::Skip);
        let mut acked = Vec::new();

        sampler
            .consume_with(&mut from_values(docs), |index, _doc, schema| {
                acked.push((index, schema.count()));
            })
            .unwrap();

        assert_eq!(acked, vec![(0, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_sessions_accumulate_across_sources() {
        let config = InferenceConfig::builder().max_values(1).build();
        let mut sampler = SchemaSampler::new(Schema::with_config(config));
        sampler.consume(&mut from_values(vec![json!({"a": 1})])).unwrap();
        sampler.consume(&mut from_values(vec![json!({"a": 2})])).unwrap();

        let (schema, report) = sampler.finish();
        assert_eq!(report.documents_processed, 2);
        assert_eq!(schema.field("a").unwrap().unique(), 2);
        assert_eq!(schema.serialize().fields[0].values.as_ref().unwrap().len(), 1);
    }
}
