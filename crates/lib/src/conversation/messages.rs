//! Reply texts shown to customers and support staff.

use super::rules::Reply;
use chrono::{DateTime, FixedOffset, Local, Utc};

const NAV_MENU: &str = "🔁 Digite *5* para voltar ao menu principal.";
const NAV_CLOSE: &str = "🔚 Digite *6* para encerrar o atendimento.";

/// Fallback when the transport has no display name for the customer.
pub const DEFAULT_CUSTOMER_NAME: &str = "cliente";

/// Per-message values some replies interpolate.
#[derive(Debug, Clone, Default)]
pub struct ReplyContext {
    pub display_name: String,
    /// Release time already rendered as `HH:MM`.
    pub release_label: String,
}

impl ReplyContext {
    /// First word of the display name, used to greet.
    pub fn first_name(&self) -> &str {
        self.display_name
            .split_whitespace()
            .next()
            .unwrap_or(DEFAULT_CUSTOMER_NAME)
    }
}

/// Renders [`Reply`] kinds into text.
#[derive(Debug, Clone)]
pub struct Composer {
    company_name: String,
}

impl Composer {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
        }
    }

    pub fn render(&self, reply: &Reply, ctx: &ReplyContext) -> String {
        match reply {
            Reply::Welcome => format!(
                "Olá, {}! 👋\n\nBem-vindo(a) ao *Suporte da {}*. Estamos aqui para te ajudar! 💧",
                ctx.first_name(),
                self.company_name
            ),
            Reply::Menu => main_menu(),
            Reply::Closing => format!(
                "Agradecemos o seu contato!\nSe precisar de algo mais, estaremos sempre à disposição. 💧\n\n{}",
                NAV_MENU
            ),
            Reply::EquipmentChecklist => format!(
                "Para ajudar na identificação do problema com seu equipamento, pedimos que siga os seguintes passos:\n\n\
                 1. Verifique se o LED do equipamento está aceso.\n\
                 2. Inspecione o cabo da antena satélite e veja se há sinais de rompimento ou obstrução da visada.\n\
                 3. Verifique se a tomada está energizada.\n\
                 4. Acione um eletricista se for preciso.\n\n\
                 Estamos aqui para te apoiar com os próximos passos. ✅\n\n{}\n{}",
                NAV_MENU, NAV_CLOSE
            ),
            Reply::SystemTopics => format!(
                "Escolha o tópico de sua dúvida:\n\n\
                 1 - Cadastro de Usuários\n\
                 2 - Preenchimento de Outorga\n\
                 3 - Vínculo de Responsável Técnico\n\n{}\n{}",
                NAV_MENU, NAV_CLOSE
            ),
            Reply::CalibrationChooser => format!(
                "Selecione o tipo de ponto para calibração:\n\n1 - Poço\n2 - Rio\n\n{}\n{}",
                NAV_MENU, NAV_CLOSE
            ),
            Reply::WellInstructions => format!(
                "📍 *Calibração - Poço*\n1 - Aferir dados de nível do Poço\n\n\
                 🧭 Digite *1* para voltar ao menu de calibração.\n{}\n{}",
                NAV_MENU, NAV_CLOSE
            ),
            Reply::RiverInstructions => format!(
                "🌊 *Calibração - Rio*\n2 - Dados do barramento Offset\n\n\
                 🌊 Digite *2* para voltar ao menu de calibração.\n{}\n{}",
                NAV_MENU, NAV_CLOSE
            ),
            Reply::TopicAck(choice) => {
                format!("Você escolheu: {}\n\n{}\n{}", choice, NAV_MENU, NAV_CLOSE)
            }
            Reply::PauseNotice => format!(
                "Tudo bem! ✅ Já recebemos sua mensagem.\n\n\
                 Aguarde alguns minutos, nossa equipe irá entrar em contato com você.\n\n\
                 🕒 *O atendimento automático será reativado às {}.*\n\n{}\n{}",
                ctx.release_label, NAV_MENU, NAV_CLOSE
            ),
        }
    }

    /// Alert sent to each support contact on escalation.
    pub fn escalation_alert(&self, display_name: &str, sender_id: &str) -> String {
        format!(
            "🚨 *Alerta de atendimento personalizado:*\n\nO cliente *{}* escolheu 'Outros assuntos'.\nNúmero: {}",
            display_name,
            contact_reference(sender_id)
        )
    }
}

fn main_menu() -> String {
    "Por favor, escolha uma das opções abaixo digitando o número correspondente:\n\n\
     1️⃣ - Problema no Equipamento (Ausência de relatório)\n\
     2️⃣ - Dúvidas sobre o Sistema\n\
     3️⃣ - Calibrações\n\
     4️⃣ - Outros assuntos\n\n\
     ⏩ Digite *5* a qualquer momento para voltar ao menu principal."
        .to_string()
}

/// Dialable link for a transport address: the part before `@`.
pub fn contact_reference(sender_id: &str) -> String {
    let number = sender_id.split('@').next().unwrap_or(sender_id);
    format!("wa.me/{}", number)
}

/// Render an instant as `HH:MM`, in a fixed offset when given, otherwise process local time.
pub fn release_label(at: DateTime<Utc>, utc_offset_minutes: Option<i32>) -> String {
    match utc_offset_minutes.and_then(|m| FixedOffset::east_opt(m * 60)) {
        Some(offset) => at.with_timezone(&offset).format("%H:%M").to_string(),
        None => at.with_timezone(&Local).format("%H:%M").to_string(),
    }
}
