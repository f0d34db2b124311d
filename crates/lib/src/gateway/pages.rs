//! HTML pages served by the gateway (status, QR, not found).

const QR_RENDER_URL: &str = "https://api.qrserver.com/v1/create-qr-code/";

/// Status page; fetches `/status` client-side.
pub fn index_html(port: u16) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Hydrobot</title>
    <style>
        body {{ font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; line-height: 1.6; }}
        .status {{ padding: 10px; border-radius: 5px; margin: 20px 0; }}
        .ready {{ background-color: #d4edda; color: #155724; }}
        .initializing, .qr-received {{ background-color: #fff3cd; color: #856404; }}
        .error, .disconnected {{ background-color: #f8d7da; color: #721c24; }}
        .authenticated {{ background-color: #cce5ff; color: #004085; }}
        .refresh {{ background-color: #007bff; color: white; border: none; padding: 10px 15px; border-radius: 5px; cursor: pointer; }}
    </style>
</head>
<body>
    <h1>Status do Bot</h1>
    <div class="status" id="statusDiv">Carregando status...</div>
    <p>Última atualização: <span id="lastUpdate"></span></p>
    <button class="refresh" onclick="location.reload()">Atualizar</button>
    <h2>Informações</h2>
    <ul>
        <li>Porta: {port}</li>
        <li>Versão: {version}</li>
    </ul>
    <script>
        document.getElementById('lastUpdate').textContent = new Date().toLocaleString();
        fetch('/status')
            .then(response => response.json())
            .then(data => {{
                const statusDiv = document.getElementById('statusDiv');
                statusDiv.textContent = 'Status: ' + data.status;
                statusDiv.className = 'status ' + data.status;
                if (data.hasQR) {{
                    statusDiv.innerHTML += '<p>QR Code disponível em <a href="/qr" target="_blank">/qr</a></p>';
                }}
            }})
            .catch(error => {{
                document.getElementById('statusDiv').textContent = 'Erro ao buscar status: ' + error;
                document.getElementById('statusDiv').className = 'status error';
            }});
    </script>
</body>
</html>"#,
        port = port,
        version = env!("CARGO_PKG_VERSION"),
    )
}

/// Image URL rendering `artifact` as a QR code.
pub fn qr_image_url(artifact: &str) -> String {
    reqwest::Url::parse_with_params(QR_RENDER_URL, &[("size", "300x300"), ("data", artifact)])
        .map(|u| u.to_string())
        .unwrap_or_default()
}

/// Page showing the pairing QR. `last_saved` marks a fallback to the persisted artifact.
pub fn qr_html(artifact: &str, last_saved: bool) -> String {
    let title = if last_saved {
        "Escaneie o QR Code (Último Salvo)"
    } else {
        "Escaneie o QR Code"
    };
    let note = if last_saved {
        "<p><small>Este é o último QR code salvo. Se não funcionar, reinicie o cliente.</small></p>"
    } else {
        ""
    };
    format!(
        r#"<html>
    <head>
        <title>{title}</title>
        <meta name="viewport" content="width=device-width, initial-scale=1.0">
    </head>
    <body style="display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: #f4f4f4; font-family: sans-serif;">
        <div style="text-align: center;">
            <h1>{title}</h1>
            <img src="{src}" alt="QR Code" />
            <p>Abra o aplicativo de mensagens no seu celular e escaneie este código para conectar o bot</p>
            {note}
        </div>
    </body>
</html>"#,
        title = title,
        src = qr_image_url(artifact).replace('&', "&amp;"),
        note = note,
    )
}

pub fn not_found_html() -> &'static str {
    r#"<html>
    <head>
        <title>Página não encontrada</title>
        <meta name="viewport" content="width=device-width, initial-scale=1.0">
    </head>
    <body style="font-family: Arial, sans-serif; text-align: center; padding: 50px;">
        <h1>404 - Página não encontrada</h1>
        <p>A página que você está procurando não existe.</p>
        <p><a href="/">Voltar para a página inicial</a></p>
    </body>
</html>"#
}
