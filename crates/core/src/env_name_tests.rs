use super::to_env_var_name;

#[test]
fn git_box_api_key() {
    assert_eq!(to_env_var_name("git-box", "apiKey"), "GIT_BOX_API_KEY");
}

#[test]
fn filesystem_workdir() {
    assert_eq!(to_env_var_name("filesystem", "workdir"), "FILESYSTEM_WORKDIR");
}

#[test]
fn already_upper_snake_is_idempotent() {
    assert_eq!(to_env_var_name("GIT_BOX", "API_KEY"), "GIT_BOX_API_KEY");
}

#[test]
fn camel_case_param_with_multiple_humps() {
    assert_eq!(
        to_env_var_name("slack", "channelWebhookUrl"),
        "SLACK_CHANNEL_WEBHOOK_URL"
    );
}

#[test]
fn whitespace_and_underscore_mix_normalizes() {
    assert_eq!(to_env_var_name("my photon", "some_param"), "MY_PHOTON_SOME_PARAM");
}
