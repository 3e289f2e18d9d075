#[cfg(test)]
mod tests {
    use crate::*;

    // ============================================================================
    // Argument parsing
    // ============================================================================

    #[test]
    fn test_cli_parse_broker_defaults() {
        let args: Cli = Cli::from_args(&["svcproxy"], &["broker"]).unwrap();
        match args.command {
            Commands::Broker(BrokerArgs {
                client_inbound,
                client_outbound,
                server_inbound,
                server_outbound,
            }) => {
                let defaults = BrokerConfig::default();
                assert_eq!(client_inbound, defaults.client_inbound);
                assert_eq!(client_outbound, defaults.client_outbound);
                assert_eq!(server_inbound, defaults.server_inbound);
                assert_eq!(server_outbound, defaults.server_outbound);
            }
            _ => panic!("Expected Broker command"),
        }
    }

    #[test]
    fn test_cli_parse_broker_custom_endpoints() {
        let args: Cli = Cli::from_args(&["svcproxy"], &[
            "broker",
            "--client-inbound", "tcp://0.0.0.0:7000",
            "--server-outbound", "tcp://0.0.0.0:7003",
        ]).unwrap();
        match args.command {
            Commands::Broker(BrokerArgs { client_inbound, client_outbound, server_outbound, .. }) => {
                assert_eq!(client_inbound, "tcp://0.0.0.0:7000");
                assert_eq!(client_outbound, "tcp://127.0.0.1:5556"); // default
                assert_eq!(server_outbound, "tcp://0.0.0.0:7003");
            }
            _ => panic!("Expected Broker command"),
        }
    }

    #[test]
    fn test_cli_parse_call() {
        let args: Cli = Cli::from_args(&["svcproxy"], &[
            "call",
            "calculator::Calculator",
            "Sum",
            "[1, 2]",
        ]).unwrap();
        match args.command {
            Commands::Call(CallArgs { service, operation, args, inbound, codec, timeout_ms, .. }) => {
                assert_eq!(service, "calculator::Calculator");
                assert_eq!(operation, "Sum");
                assert_eq!(args, "[1, 2]");
                assert_eq!(inbound, "tcp://127.0.0.1:5555"); // default
                assert_eq!(codec, Codec::Json);
                assert!(timeout_ms.is_none());
            }
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_cli_parse_call_without_arguments() {
        let args: Cli = Cli::from_args(&["svcproxy"], &[
            "call", "calculator::Calculator", "Reset",
            "--codec", "msgpack",
            "--timeout-ms", "250",
        ]).unwrap();
        match args.command {
            Commands::Call(CallArgs { args, codec, timeout_ms, .. }) => {
                assert_eq!(args, "[]"); // default
                assert_eq!(codec, Codec::MessagePack);
                assert_eq!(timeout_ms, Some(250));
            }
            _ => panic!("Expected Call command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_codec() {
        let result = Cli::from_args(&["svcproxy"], &[
            "call", "calculator::Calculator", "Sum", "--codec", "xml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_queue_call() {
        let args: Cli = Cli::from_args(&["svcproxy"], &[
            "queue-call",
            "calculator::Calculator",
            "Sum",
            "[1, 2]",
            "--send-queue", "calculator",
            "--password", "secret",
        ]).unwrap();
        match args.command {
            Commands::QueueCall(QueueCallArgs {
                host,
                port,
                password,
                send_queue,
                receive_queue,
                ..
            }) => {
                assert_eq!(host, "127.0.0.1"); // default
                assert_eq!(port, 6379); // default
                assert_eq!(password, Some("secret".to_string()));
                assert_eq!(send_queue, "calculator");
                assert!(receive_queue.is_none());
            }
            _ => panic!("Expected QueueCall command"),
        }
    }

    #[test]
    fn test_cli_queue_call_requires_send_queue() {
        let result = Cli::from_args(&["svcproxy"], &["queue-call", "calculator::Calculator", "Sum"]);
        assert!(result.is_err());
    }

    // ============================================================================
    // Call arguments
    // ============================================================================

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            parse_arguments("[1, \"two\", null]").unwrap(),
            vec![Value::from(1), Value::from("two"), Value::Null]
        );
        assert!(parse_arguments("[]").unwrap().is_empty());
        assert_eq!(parse_arguments("42").unwrap(), vec![Value::from(42)]);
        assert!(parse_arguments("[1,").is_err());
    }
}
