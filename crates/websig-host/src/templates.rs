use maud::{html, Markup, PreEscaped, DOCTYPE};

pub const SETTINGS_ELEMENT_ID: &str = "websig-settings";

pub struct PageConfig<'a> {
    pub title: &'a str,
    /// Serialized `EmbedSettings`, already safe to inline in a script element
    pub embed_settings: &'a str,
}

/// Make JSON safe to place inside a `<script>` element
pub fn inline_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

const CLIENT_SCRIPT: &str = r#"
import init, { WebSigEmbed } from '/pkg/websig_embed.js';

const log = (line) => {
  const item = document.createElement('li');
  item.textContent = `${new Date().toLocaleTimeString()} ${line}`;
  document.getElementById('event-log').prepend(item);
};

await init();
const settings = JSON.parse(document.getElementById('websig-settings').textContent);
const embed = new WebSigEmbed(settings);

const render = () => {
  document.getElementById('wallet-status').textContent = embed.status;
  document.getElementById('wallet-address').textContent = embed.address || '-';
  document.getElementById('sign-button').disabled = embed.status !== 'connected';
};

embed.onEvent((event) => {
  log(JSON.stringify(event));
  render();
});

const run = (action) => () => {
  try {
    action();
  } catch (e) {
    log(`error: ${e}`);
  }
  render();
};

document.getElementById('connect-button').addEventListener('click', run(() => embed.connect()));
document.getElementById('sign-button').addEventListener('click', run(() => embed.signTransaction('mock_transaction_data')));
render();
"#;

pub fn host_page(config: &PageConfig) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (config.title) }
                link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bulma@1.0.2/css/bulma.min.css";
            }
            body {
                section class="section" {
                    div class="container" {
                        h1 class="title" { (config.title) }
                        p class="subtitle" { "Cross-origin integration with the WebSig wallet" }

                        div class="columns" {
                            div class="column" {
                                div class="box" {
                                    h2 class="title is-5" { "Wallet Status" }
                                    p { "Status: " span id="wallet-status" class="has-text-weight-bold" { "disconnected" } }
                                    p { "Address: " code id="wallet-address" { "-" } }
                                }
                            }
                            div class="column" {
                                div class="box" {
                                    h2 class="title is-5" { "Actions" }
                                    div class="buttons" {
                                        button id="connect-button" class="button is-link" { "Connect Wallet" }
                                        button id="sign-button" class="button" disabled { "Sign Transaction" }
                                    }
                                }
                            }
                        }

                        div class="box" {
                            h2 class="title is-5" { "Event Log" }
                            ul id="event-log" class="is-family-monospace is-size-7" {}
                        }
                    }
                }

                script type="application/json" id=(SETTINGS_ELEMENT_ID) {
                    (PreEscaped(config.embed_settings))
                }
                script type="module" {
                    (PreEscaped(CLIENT_SCRIPT))
                }
            }
        }
    }
}
