use std::path::Path;

use harbor_engine::{Authorization, EngineConfig, NkeyUser, Permissions, User};

static CONFIG_TEMPLATE: &str = include_str!("../templates/nats-server.conf");

/// Renders the `nats-server` configuration file for `config`.
///
/// `store_dir` is the resolved JetStream directory: the configured one, or a
/// scratch directory owned by the engine when storage is ephemeral.
pub(crate) fn render_config(config: &EngineConfig, server_name: &str, store_dir: &Path) -> String {
    // nats-server reads 0 as its default port; -1 asks for a random one.
    let port = match config.port {
        0 => "-1".to_string(),
        port => port.to_string(),
    };

    let mut rendered = CONFIG_TEMPLATE
        .replace("{port}", &port)
        .replace("{debug}", bool_str(config.debug))
        .replace("{trace}", bool_str(config.trace))
        .replace("{host}", &quote(&config.host))
        .replace("{server_name}", &quote(server_name));

    if config.jetstream {
        rendered.push_str(&format!(
            "\njetstream {{\n    store_dir: \"{}\"\n}}\n",
            quote(&store_dir.to_string_lossy())
        ));
    }

    if let Some(authorization) = &config.authorization {
        rendered.push('\n');
        rendered.push_str(&render_authorization(authorization, config.jetstream));
    }

    rendered
}

fn render_authorization(authorization: &Authorization, jetstream: bool) -> String {
    match authorization {
        Authorization::Token(token) => {
            format!("authorization {{\n    token: \"{}\"\n}}\n", quote(token))
        }
        Authorization::Users {
            users,
            system_user: None,
        } => format!(
            "authorization {{\n    users: [\n{}    ]\n}}\n",
            render_users(users.iter(), 8)
        ),
        Authorization::Users {
            users,
            system_user: Some(system_user),
        } => {
            let (system, regular): (Vec<&User>, Vec<&User>) = users
                .iter()
                .partition(|user| &user.username == system_user);

            let jetstream_line = if jetstream {
                "        jetstream: enabled\n"
            } else {
                ""
            };

            format!(
                "accounts {{\n    SYS: {{\n        users: [\n{}        ]\n    }}\n    APP: {{\n{}        users: [\n{}        ]\n    }}\n}}\nsystem_account: SYS\n",
                render_users(system.into_iter(), 12),
                jetstream_line,
                render_users(regular.into_iter(), 12),
            )
        }
        Authorization::Nkeys(nkey_users) => {
            let entries: String = nkey_users.iter().map(render_nkey_user).collect();
            format!("authorization {{\n    users: [\n{entries}    ]\n}}\n")
        }
    }
}

fn render_users<'a>(users: impl Iterator<Item = &'a User>, indent: usize) -> String {
    users
        .map(|user| {
            format!(
                "{:indent$}{{ user: \"{}\", password: \"{}\" }}\n",
                "",
                quote(&user.username),
                quote(&user.password),
            )
        })
        .collect()
}

fn render_nkey_user(user: &NkeyUser) -> String {
    match &user.permissions {
        None => format!("        {{ nkey: \"{}\" }}\n", quote(&user.public_key)),
        Some(Permissions { publish, subscribe }) => format!(
            "        {{ nkey: \"{}\", permissions: {{ publish: {}, subscribe: {} }} }}\n",
            quote(&user.public_key),
            render_allow_list(publish),
            render_allow_list(subscribe),
        ),
    }
}

// An empty allow list would fall back to "allow everything" on the server.
fn render_allow_list(subjects: &[String]) -> String {
    if subjects.is_empty() {
        return "{ deny: [\">\"] }".to_string();
    }

    let quoted: Vec<String> = subjects
        .iter()
        .map(|subject| format!("\"{}\"", quote(subject)))
        .collect();

    format!("{{ allow: [{}] }}", quoted.join(", "))
}

const fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> EngineConfig {
        EngineConfig {
            authorization: None,
            debug: false,
            host: "localhost".to_string(),
            jetstream: true,
            no_log: false,
            no_sigs: true,
            port: 4222,
            server_name: None,
            store_dir: None,
            trace: false,
        }
    }

    #[test]
    fn test_renders_listen_address_and_flags() {
        let mut config = base_config();
        config.debug = true;

        let rendered = render_config(&config, "harbor-4222", Path::new("/data/js"));

        assert!(rendered.contains("server_name: \"harbor-4222\""));
        assert!(rendered.contains("host: \"localhost\""));
        assert!(rendered.contains("port: 4222"));
        assert!(rendered.contains("debug: true"));
        assert!(rendered.contains("trace: false"));
        assert!(rendered.contains("store_dir: \"/data/js\""));
    }

    #[test]
    fn test_omits_jetstream_block_when_disabled() {
        let mut config = base_config();
        config.jetstream = false;

        let rendered = render_config(&config, "n", Path::new("/data/js"));

        assert!(!rendered.contains("jetstream"));
    }

    #[test]
    fn test_renders_token() {
        let mut config = base_config();
        config.authorization = Some(Authorization::Token("s3cr\"et".to_string()));

        let rendered = render_config(&config, "n", Path::new("/js"));

        assert!(rendered.contains("token: \"s3cr\\\"et\""));
    }

    #[test]
    fn test_renders_plain_users() {
        let mut config = base_config();
        config.authorization = Some(Authorization::Users {
            users: vec![User::new("myuser", "mypassword")],
            system_user: None,
        });

        let rendered = render_config(&config, "n", Path::new("/js"));

        assert!(rendered.contains("{ user: \"myuser\", password: \"mypassword\" }"));
        assert!(!rendered.contains("system_account"));
    }

    #[test]
    fn test_places_system_user_in_system_account() {
        let mut config = base_config();
        config.authorization = Some(Authorization::Users {
            users: vec![
                User::new("system", "systempassword"),
                User::new("myuser", "mypassword"),
            ],
            system_user: Some("system".to_string()),
        });

        let rendered = render_config(&config, "n", Path::new("/js"));

        let sys = rendered.find("SYS: {").unwrap();
        let app = rendered.find("APP: {").unwrap();
        let system_user = rendered.find("user: \"system\"").unwrap();
        let regular_user = rendered.find("user: \"myuser\"").unwrap();

        assert!(sys < system_user && system_user < app);
        assert!(app < regular_user);
        assert!(rendered.contains("jetstream: enabled"));
        assert!(rendered.contains("system_account: SYS"));
    }

    #[test]
    fn test_renders_nkeys_with_permissions() {
        let mut config = base_config();
        config.authorization = Some(Authorization::Nkeys(vec![
            NkeyUser::new("UAZMB"),
            NkeyUser::new("UCL5D").with_permissions(Permissions {
                publish: vec!["tasks.>".to_string()],
                subscribe: vec![],
            }),
        ]));

        let rendered = render_config(&config, "n", Path::new("/js"));

        assert!(rendered.contains("{ nkey: \"UAZMB\" }"));
        assert!(rendered.contains(
            "{ nkey: \"UCL5D\", permissions: { publish: { allow: [\"tasks.>\"] }, subscribe: { deny: [\">\"] } } }"
        ));
    }
}
