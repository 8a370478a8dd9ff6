use printbot_core::{
    domain::MessageRef,
    messaging::types::{DocumentMessage, InboundAttachment},
};

pub(super) fn to_document_message(
    message: MessageRef,
    username: Option<String>,
    doc: &teloxide::types::Document,
) -> DocumentMessage {
    let mut attachment = InboundAttachment::new(doc.file.id.clone(), doc.file_name.clone());
    attachment.size = Some(u64::from(doc.file.size));
    attachment.mime_type = doc.mime_type.as_ref().map(|m| m.essence_str().to_string());

    DocumentMessage {
        message,
        username,
        attachment,
    }
}
