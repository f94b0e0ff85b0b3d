// src/services/comment_meta.rs
//
// O SaaS de contabilidade só aceita `description` livre nos comentários.
// Os metadados vão num bloco no início do texto:
//
//   [CUSTOM_META]
//   chave=valor
//   [/CUSTOM_META]
//
//   <texto original>

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;

use crate::{
    models::zoho::{CommentView, ZohoComment, ZohoContact},
    services::zoho_client::ContactDirectory,
};

const OPEN_TAG: &str = "[CUSTOM_META]";
const CLOSE_TAG: &str = "[/CUSTOM_META]";

pub const COMMENT_TYPE: &str = "comment_type";
pub const COMMENT_TYPE_CLIENT: &str = "client";
pub const COMMENT_TYPE_SYSTEM: &str = "system";

static META_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\[CUSTOM_META\](.*?)\[/CUSTOM_META\]").expect("regex do bloco de metadados")
});

/// Pares em ordem: identidade do cliente (se resolvida), tipo, extras.
/// Um extra com chave já presente substitui o valor no lugar.
pub fn meta_pairs(contact: Option<&ZohoContact>, email: &str, extra: &[(String, String)]) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = match contact {
        Some(contact) => vec![
            ("customer_id".into(), contact.contact_id.clone()),
            ("customer_name".into(), contact.contact_name.clone()),
            ("customer_email".into(), email.to_string()),
            (COMMENT_TYPE.into(), COMMENT_TYPE_CLIENT.into()),
        ],
        None => vec![(COMMENT_TYPE.into(), COMMENT_TYPE_SYSTEM.into())],
    };

    for (key, value) in extra {
        match pairs.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.clone(),
            None => pairs.push((key.clone(), value.clone())),
        }
    }
    pairs
}

/// Bloco seguido de uma linha em branco; vazio quando não há pares.
pub fn render_meta_block(pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let mut block = String::from(OPEN_TAG);
    block.push('\n');
    for (key, value) in pairs {
        // Uma quebra de linha no valor abriria um par falso
        block.push_str(&format!("{}={}\n", single_line(key), single_line(value)));
    }
    block.push_str(CLOSE_TAG);
    block.push_str("\n\n");
    block
}

fn single_line(raw: &str) -> String {
    raw.replace(['\r', '\n'], " ").trim().to_string()
}

/// Resolve o e-mail no diretório de contatos e monta a `description`.
/// Falha na consulta conta como contato não resolvido.
pub async fn wrap_comment(
    directory: &dyn ContactDirectory,
    email: &str,
    text: &str,
    extra: &[(String, String)],
) -> String {
    let contact = match directory.find_contact_by_email(email).await {
        Ok(contact) => contact,
        Err(e) => {
            tracing::warn!("Falha ao resolver contato para comentário: {}", e);
            None
        }
    };
    let pairs = meta_pairs(contact.as_ref(), email, extra);
    format!("{}{}", render_meta_block(&pairs), text.trim())
}

pub fn extract_comment_meta(description: &str) -> HashMap<String, String> {
    let Some(captures) = META_BLOCK.captures(description) else {
        return HashMap::new();
    };
    captures[1]
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

pub fn strip_comment_meta(description: &str) -> String {
    META_BLOCK.replace(description, "").trim().to_string()
}

pub fn comment_view(comment: ZohoComment) -> CommentView {
    CommentView {
        metadata: extract_comment_meta(&comment.description),
        text: strip_comment_meta(&comment.description),
        comment_id: comment.comment_id,
        commented_by: comment.commented_by,
        date: comment.date,
    }
}

/// Comentários visíveis ao usuário final: sem os de sistema, texto limpo.
pub fn visible_comments(comments: Vec<ZohoComment>) -> Vec<CommentView> {
    comments
        .into_iter()
        .map(comment_view)
        .filter(|view| view.metadata.get(COMMENT_TYPE).map(String::as_str) != Some(COMMENT_TYPE_SYSTEM))
        .collect()
}
