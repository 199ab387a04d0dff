use aws_sdk_sns::Client as SnsClient;

/// Send a text via SNS direct SMS. Notification is best-effort everywhere it
/// is used: the caller logs a failure and moves on, never surfacing it into
/// the primary operation's result.
pub async fn send_sms(
    client: &SnsClient,
    destination: &str,
    body: &str,
) -> Result<(), String> {
    if destination.is_empty() {
        return Err("No destination phone number".to_string());
    }

    client
        .publish()
        .phone_number(destination)
        .message(body)
        .send()
        .await
        .map_err(|e| format!("Failed to send SMS: {:?}", e))?;

    tracing::info!("Sent SMS to {}", destination);
    Ok(())
}
