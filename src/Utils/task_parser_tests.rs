/////////////////////////////TESTS////////////////////////////////////////////////////
/*
tests:
titles, keys and values
sections and documents
comments
malformed documents
*/

#[cfg(test)]
mod tests1 {
    use crate::Utils::task_parser::{
        Value, filter_comments, parse_document, parse_document_as, parse_key,
        parse_key_value_pair, parse_section, parse_title, parse_value, parse_value_list,
    };

    #[test]
    fn test_parse_title() {
        let (remaining, title) = parse_title("budget\n max_steps: 10").unwrap();
        assert_eq!(title, "budget");
        assert_eq!(remaining, "max_steps: 10");

        let (remaining, title) = parse_title("root_finding window: -10, 10").unwrap();
        assert_eq!(title, "root_finding");
        assert_eq!(remaining, "window: -10, 10");
    }

    #[test]
    fn test_parse_key() {
        let (remaining, key) = parse_key("max_steps: 10").unwrap();
        assert_eq!(key, "max_steps");
        assert_eq!(remaining, ": 10");
        assert!(parse_key("1key: 10").is_err());
    }

    #[test]
    fn test_parse_value() {
        let (remaining, value) = parse_value("strict, next").unwrap();
        assert_eq!(value, Value::String("strict".to_string()));
        assert_eq!(remaining, ", next");

        let (_, value) = parse_value("2000").unwrap();
        assert_eq!(value, Value::Integer(2000));

        let (_, value) = parse_value("1e-3").unwrap();
        assert_eq!(value, Value::Float(1e-3));

        let (_, value) = parse_value("false").unwrap();
        assert_eq!(value, Value::Boolean(false));
    }

    #[test]
    fn test_parse_value_list() {
        let (remaining, values) = parse_value_list("-10, 10.5 ,x\nnext").unwrap();
        assert_eq!(
            values,
            vec![
                Value::Integer(-10),
                Value::Float(10.5),
                Value::String("x".to_string())
            ]
        );
        assert_eq!(remaining, "\nnext");
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("window : -5, 5\n cells: 10").unwrap();
        assert_eq!(key, "window");
        assert_eq!(values, vec![Value::Integer(-5), Value::Integer(5)]);
        assert_eq!(remaining, "cells: 10");
    }

    #[test]
    fn test_parse_section() {
        let input = "plot\n  samples: 400\n  window: -2, 2\nlogging\n  level: debug";
        let (remaining, (title, section)) = parse_section(input).unwrap();
        assert_eq!(title, "plot");
        assert_eq!(section.len(), 2);
        assert_eq!(section["samples"], vec![Value::Integer(400)]);
        assert!(remaining.starts_with("logging"));
    }

    #[test]
    fn test_parse_document() {
        let input = "parser\n policy: strict\n variable: t\nbudget\n max_steps: 500\n timeout_ms: 20\n";
        let (remaining, doc) = parse_document(input).unwrap();
        assert!(remaining.trim().is_empty());
        assert_eq!(doc.len(), 2);
        assert_eq!(
            doc["parser"]["policy"].as_ref().unwrap()[0].as_string().unwrap(),
            "strict"
        );
        assert_eq!(doc["budget"]["timeout_ms"].as_ref().unwrap()[0].as_integer(), Some(20));
    }

    #[test]
    fn test_comments_and_empty_values() {
        let input = r#"
        // analysis settings
        # another comment
        logging
          level: warn
          to_file:
        % trailing comment
        "#;
        let filtered = filter_comments(input);
        assert!(!filtered.contains("comment"));
        let doc = parse_document_as(input).unwrap();
        assert_eq!(doc["logging"]["to_file"], None);
        assert_eq!(
            doc["logging"]["level"].as_ref().unwrap()[0].to_string_value(),
            "warn"
        );
        assert!(parse_document_as("  // nothing here\n").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_document() {
        assert!(parse_document_as("budget\n max_steps: 10\n !!!").is_err());
        assert!(parse_document_as("budget").is_err());
    }
}
